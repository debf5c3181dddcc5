use std::{borrow::Cow, ops::Index};

use crate::{ClassFileError, Result};

macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $i:ident) => {
        match $cp.get($index) {
            Ok($crate::constant_pool::CpInfo::$i(n)) => Ok(n),
            _ => Err($crate::ClassFileError::InvalidConstantIndex {
                index: $index,
                expected: stringify!($i),
            }),
        }
    };
}

/// The constant pool of a class file.
///
/// Entries are addressed the way the class file addresses them: starting at
/// 1, with `Long` and `Double` taking up two indices. The second index of such
/// an entry holds [`CpInfo::Padding`] and can't be dereferenced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConstantPool {
    cp_infos: Vec<CpInfo>,
}
impl ConstantPool {
    /// Builds a pool from its slots in index order.
    ///
    /// Every `Long` and `Double` must be followed by a [`CpInfo::Padding`]
    /// slot, and padding may appear nowhere else.
    pub fn new(cp_infos: Vec<CpInfo>) -> Result<Self> {
        if cp_infos.len() >= u16::MAX as usize {
            return Err(ClassFileError::MalformedConstantPool(format!(
                "{} slots don't fit in a constant pool",
                cp_infos.len()
            )));
        }

        let mut slots = cp_infos.iter().enumerate();
        while let Some((i, cp_info)) = slots.next() {
            if cp_info.is_padding() {
                return Err(ClassFileError::MalformedConstantPool(format!(
                    "unexpected padding at index {}",
                    i + 1
                )));
            }
            if cp_info.slot_size() == 2 && !matches!(slots.next(), Some((_, CpInfo::Padding))) {
                return Err(ClassFileError::MalformedConstantPool(format!(
                    "missing padding after the entry at index {}",
                    i + 1
                )));
            }
        }

        Ok(Self { cp_infos })
    }

    /// Number of logical constants, padding excluded.
    pub fn len(&self) -> usize {
        self.cp_infos.iter().filter(|c| !c.is_padding()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.cp_infos.is_empty()
    }

    /// Number of indexable slots, padding included.
    pub fn slot_count(&self) -> usize {
        self.cp_infos.len()
    }

    /// The `constant_pool_count` as it appears in the class file.
    pub fn count(&self) -> Result<u16> {
        u16::try_from(self.cp_infos.len() + 1).map_err(|_| {
            ClassFileError::MalformedConstantPool(format!(
                "{} slots don't fit in a constant pool",
                self.cp_infos.len()
            ))
        })
    }

    pub fn get(&self, index: u16) -> Result<&CpInfo> {
        match index
            .checked_sub(1)
            .and_then(|i| self.cp_infos.get(i as usize))
        {
            Some(CpInfo::Padding) | None => Err(ClassFileError::InvalidConstantIndex {
                index,
                expected: "constant",
            }),
            Some(cp_info) => Ok(cp_info),
        }
    }

    /// Iterates over the logical constants along with their index.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &CpInfo)> {
        self.cp_infos
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_padding())
            .map(|(i, c)| (i as u16 + 1, c))
    }

    /// Iterates over every slot, padding included, in index order.
    pub fn slots(&self) -> std::slice::Iter<'_, CpInfo> {
        self.cp_infos.iter()
    }

    pub fn utf8(&self, index: u16) -> Result<&[u8]> {
        matches_cp_info!(self, index, Utf8).map(Vec::as_slice)
    }

    /// The `Utf8` constant at `index`, decoded lossily.
    ///
    /// Class files store modified UTF-8, which only differs from UTF-8 for
    /// NUL and supplementary characters.
    pub fn utf8_str(&self, index: u16) -> Result<Cow<'_, str>> {
        self.utf8(index).map(String::from_utf8_lossy)
    }

    pub fn class(&self, index: u16) -> Result<&ClassInfo> {
        matches_cp_info!(self, index, Class)
    }

    /// The name of the `Class` constant at `index`.
    pub fn class_name(&self, index: u16) -> Result<Cow<'_, str>> {
        let ClassInfo { name_index } = self.class(index)?;
        self.utf8_str(*name_index)
    }

    pub fn name_and_type(&self, index: u16) -> Result<&NameAndTypeInfo> {
        matches_cp_info!(self, index, NameAndType)
    }

    /// Appends `cp_info` and returns its index.
    ///
    /// If an equal constant is already present its index is returned instead
    /// and the pool is left untouched.
    pub fn push(&mut self, cp_info: CpInfo) -> Result<u16> {
        if cp_info.is_padding() {
            return Err(ClassFileError::MalformedConstantPool(
                "padding can't be added explicitly".into(),
            ));
        }

        if let Some(position) = self.cp_infos.iter().position(|c| *c == cp_info) {
            return Ok(position as u16 + 1);
        }

        let slot_size = cp_info.slot_size();
        if self.cp_infos.len() + slot_size >= u16::MAX as usize {
            return Err(ClassFileError::MalformedConstantPool(
                "constant pool is full".into(),
            ));
        }

        let index = self.cp_infos.len() as u16 + 1;
        self.cp_infos.push(cp_info);
        (1..slot_size).for_each(|_| self.cp_infos.push(CpInfo::Padding));

        Ok(index)
    }

    pub fn create_utf8(&mut self, value: &str) -> Result<u16> {
        self.push(CpInfo::Utf8(value.as_bytes().to_vec()))
    }

    pub fn create_class(&mut self, name: &str) -> Result<u16> {
        let name_index = self.create_utf8(name)?;
        self.push(CpInfo::Class(ClassInfo { name_index }))
    }

    pub fn create_string(&mut self, value: &str) -> Result<u16> {
        let string_index = self.create_utf8(value)?;
        self.push(CpInfo::String { string_index })
    }

    pub fn create_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.create_utf8(name)?;
        let descriptor_index = self.create_utf8(descriptor)?;
        self.push(CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    pub fn create_field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> Result<u16> {
        let ref_info = self.create_ref_info(class, name, descriptor)?;
        self.push(CpInfo::FieldRef(ref_info))
    }

    pub fn create_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> Result<u16> {
        let ref_info = self.create_ref_info(class, name, descriptor)?;
        self.push(CpInfo::MethodRef(ref_info))
    }

    pub fn create_interface_method_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16> {
        let ref_info = self.create_ref_info(class, name, descriptor)?;
        self.push(CpInfo::InterfaceMethodRef(ref_info))
    }

    fn create_ref_info(&mut self, class: &str, name: &str, descriptor: &str) -> Result<RefInfo> {
        let class_index = self.create_class(class)?;
        let name_and_type_index = self.create_name_and_type(name, descriptor)?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }
}

/// Panics on an index that [`ConstantPool::get`] would reject.
impl Index<u16> for ConstantPool {
    type Output = CpInfo;

    fn index(&self, index: u16) -> &Self::Output {
        match self.get(index) {
            Ok(cp_info) => cp_info,
            Err(e) => panic!("{}", e),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CpInfo {
    /// Raw bytes, not necessarily valid UTF-8.
    Utf8(Vec<u8>),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(ClassInfo),
    String { string_index: u16 },
    FieldRef(RefInfo),
    MethodRef(RefInfo),
    InterfaceMethodRef(RefInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    InvokeDynamic(InvokeDynamicInfo),
    /// Second slot of a `Long` or `Double`.
    Padding,
}
impl CpInfo {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELD_REF: u8 = 9;
    pub const METHOD_REF: u8 = 10;
    pub const INTERFACE_METHOD_REF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const INVOKE_DYNAMIC: u8 = 18;

    /// The tag byte, `None` for padding.
    pub fn tag(&self) -> Option<u8> {
        let tag = match self {
            CpInfo::Utf8(_) => Self::UTF8,
            CpInfo::Integer(_) => Self::INTEGER,
            CpInfo::Float(_) => Self::FLOAT,
            CpInfo::Long(_) => Self::LONG,
            CpInfo::Double(_) => Self::DOUBLE,
            CpInfo::Class(_) => Self::CLASS,
            CpInfo::String { .. } => Self::STRING,
            CpInfo::FieldRef(_) => Self::FIELD_REF,
            CpInfo::MethodRef(_) => Self::METHOD_REF,
            CpInfo::InterfaceMethodRef(_) => Self::INTERFACE_METHOD_REF,
            CpInfo::NameAndType(_) => Self::NAME_AND_TYPE,
            CpInfo::MethodHandle(_) => Self::METHOD_HANDLE,
            CpInfo::MethodType(_) => Self::METHOD_TYPE,
            CpInfo::InvokeDynamic(_) => Self::INVOKE_DYNAMIC,
            CpInfo::Padding => return None,
        };
        Some(tag)
    }

    /// Number of pool indices the entry occupies.
    pub fn slot_size(&self) -> usize {
        match self {
            CpInfo::Long(_) | CpInfo::Double(_) => 2,
            _ => 1,
        }
    }

    pub fn is_padding(&self) -> bool {
        matches!(self, CpInfo::Padding)
    }
}

// Floating point constants compare by their bits so that NaN payloads survive
// deduplication and round trips compare equal.
impl PartialEq for CpInfo {
    fn eq(&self, other: &Self) -> bool {
        use CpInfo::*;

        match (self, other) {
            (Utf8(a), Utf8(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Long(a), Long(b)) => a == b,
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Class(a), Class(b)) => a == b,
            (String { string_index: a }, String { string_index: b }) => a == b,
            (FieldRef(a), FieldRef(b)) => a == b,
            (MethodRef(a), MethodRef(b)) => a == b,
            (InterfaceMethodRef(a), InterfaceMethodRef(b)) => a == b,
            (NameAndType(a), NameAndType(b)) => a == b,
            (MethodHandle(a), MethodHandle(b)) => a == b,
            (MethodType(a), MethodType(b)) => a == b,
            (InvokeDynamic(a), InvokeDynamic(b)) => a == b,
            (Padding, Padding) => true,
            _ => false,
        }
    }
}
impl Eq for CpInfo {}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ClassInfo {
    // The constant_pool entry at name_index must be a CONSTANT_Utf8_info structure
    // representing a valid binary class or interface name encoded in internal form.
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InvokeDynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}
