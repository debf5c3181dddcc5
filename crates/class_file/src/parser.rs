use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

use crate::{
    attributes::{Attribute, Attributes, CodeAttribute, ExceptionTableEntry, RawAttribute},
    class_file::{FieldInfo, MethodInfo},
    constant_pool::{
        ClassInfo, InvokeDynamicInfo, MethodHandleInfo, MethodTypeInfo, NameAndTypeInfo, RefInfo,
    },
    AccessFlags, ClassFile, ClassFileError, ConstantPool, CpInfo, Result, MAGIC_IDENTIFIER,
};

type Endian = BigEndian;

/// How much of a class file to decode before returning.
///
/// Sections after the stopping point are left empty in the returned
/// [`ClassFile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    #[default]
    All,
    /// Stop after the constant pool.
    Constants,
    /// Stop after the interface list.
    Interfaces,
    /// Stop after the field table.
    Fields,
    /// Stop after the method table.
    Methods,
}

pub struct Parser<R> {
    r: R,
    mode: ParseMode,
}
impl<R: Read> Parser<R> {
    pub fn new(r: R) -> Self {
        Self {
            r,
            mode: ParseMode::All,
        }
    }

    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn into_inner(self) -> R {
        self.r
    }

    pub fn parse(&mut self) -> Result<ClassFile> {
        self.parse_magic_identifier()?;
        let version = self.parse_version()?;
        let constant_pool = self.parse_constant_pool()?;

        let mut class_file = ClassFile {
            version,
            constant_pool,
            ..ClassFile::default()
        };
        if self.mode == ParseMode::Constants {
            return Ok(class_file);
        }

        class_file.access_flags = AccessFlags::from_bits_retain(self.read_u16()?);
        class_file.this_class = self.read_u16()?;
        class_file.super_class = self.read_u16()?;

        let interfaces_count = self.read_u16()?;
        let mut interfaces = vec![0u16; interfaces_count as usize];
        self.r.read_u16_into::<Endian>(&mut interfaces)?;
        class_file.interfaces = interfaces;
        if self.mode == ParseMode::Interfaces {
            return Ok(class_file);
        }

        let constant_pool = &class_file.constant_pool;

        let fields_count = self.read_u16()?;
        class_file.fields = (0..fields_count)
            .map(|_| self.parse_field_info(constant_pool))
            .collect::<Result<Vec<_>>>()?;
        if self.mode == ParseMode::Fields {
            return Ok(class_file);
        }

        let methods_count = self.read_u16()?;
        class_file.methods = (0..methods_count)
            .map(|_| self.parse_method_info(constant_pool))
            .collect::<Result<Vec<_>>>()?;
        if self.mode == ParseMode::Methods {
            return Ok(class_file);
        }

        class_file.attributes = self.parse_attributes(constant_pool)?;

        Ok(class_file)
    }

    fn parse_field_info(&mut self, constant_pool: &ConstantPool) -> Result<FieldInfo> {
        let access_flags = AccessFlags::from_bits_retain(self.read_u16()?);
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;
        let attributes = self.parse_attributes(constant_pool)?;

        Ok(FieldInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_method_info(&mut self, constant_pool: &ConstantPool) -> Result<MethodInfo> {
        let access_flags = AccessFlags::from_bits_retain(self.read_u16()?);
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;
        let attributes = self.parse_attributes(constant_pool)?;

        Ok(MethodInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_magic_identifier(&mut self) -> Result<()> {
        match self.read_u32()? {
            MAGIC_IDENTIFIER => Ok(()),
            magic_identifier => Err(ClassFileError::InvalidMagicIdentifier(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.read_u16()?;
        let major = self.read_u16()?;
        Ok((major, minor))
    }

    pub fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        self.parse_cp_infos().and_then(ConstantPool::new).map_err(|e| {
            if e.is_eof() {
                ClassFileError::MalformedConstantPool("unexpected end of input".into())
            } else {
                e
            }
        })
    }

    fn parse_cp_infos(&mut self) -> Result<Vec<CpInfo>> {
        let constant_pool_count = self.read_u16()?;
        if constant_pool_count == 0 {
            return Err(ClassFileError::MalformedConstantPool(
                "constant_pool_count must be at least 1".into(),
            ));
        }

        // `count` tracks the remaining slots, so Long and Double consume two.
        let mut count = constant_pool_count as usize - 1;
        let mut res = Vec::with_capacity(count);
        while count > 0 {
            let cp_info = self.parse_cp_info()?;
            let slot_size = cp_info.slot_size();
            if slot_size > count {
                return Err(ClassFileError::MalformedConstantPool(format!(
                    "entry at index {} overflows the pool",
                    res.len() + 1
                )));
            }

            res.push(cp_info);
            (1..slot_size).for_each(|_| res.push(CpInfo::Padding));

            count -= slot_size;
        }
        Ok(res)
    }

    fn parse_cp_info(&mut self) -> Result<CpInfo> {
        let tag = self.read_u8()?;
        let cp_info = match tag {
            CpInfo::UTF8 => self.parse_utf8()?,
            CpInfo::INTEGER => CpInfo::Integer(self.r.read_i32::<Endian>()?),
            CpInfo::FLOAT => CpInfo::Float(self.r.read_f32::<Endian>()?),
            CpInfo::LONG => CpInfo::Long(self.r.read_i64::<Endian>()?),
            CpInfo::DOUBLE => CpInfo::Double(self.r.read_f64::<Endian>()?),
            CpInfo::CLASS => CpInfo::Class(ClassInfo {
                name_index: self.read_u16()?,
            }),
            CpInfo::STRING => CpInfo::String {
                string_index: self.read_u16()?,
            },
            CpInfo::FIELD_REF => CpInfo::FieldRef(self.parse_ref_info()?),
            CpInfo::METHOD_REF => CpInfo::MethodRef(self.parse_ref_info()?),
            CpInfo::INTERFACE_METHOD_REF => CpInfo::InterfaceMethodRef(self.parse_ref_info()?),
            CpInfo::NAME_AND_TYPE => self.parse_name_and_type_info()?,
            CpInfo::METHOD_HANDLE => self.parse_method_handle()?,
            CpInfo::METHOD_TYPE => CpInfo::MethodType(MethodTypeInfo {
                descriptor_index: self.read_u16()?,
            }),
            CpInfo::INVOKE_DYNAMIC => self.parse_invoke_dynamic_info()?,
            _ => {
                return Err(ClassFileError::MalformedConstantPool(format!(
                    "invalid tag type {tag}"
                )))
            }
        };

        Ok(cp_info)
    }

    fn parse_utf8(&mut self) -> Result<CpInfo> {
        let length = self.read_u16()?;
        let mut bytes = vec![0u8; length as usize];
        self.r.read_exact(&mut bytes)?;

        Ok(CpInfo::Utf8(bytes))
    }

    fn parse_name_and_type_info(&mut self) -> Result<CpInfo> {
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;

        Ok(CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    fn parse_method_handle(&mut self) -> Result<CpInfo> {
        let reference_kind = self.read_u8()?;
        let reference_index = self.read_u16()?;

        Ok(CpInfo::MethodHandle(MethodHandleInfo {
            reference_kind,
            reference_index,
        }))
    }

    fn parse_invoke_dynamic_info(&mut self) -> Result<CpInfo> {
        let bootstrap_method_attr_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(CpInfo::InvokeDynamic(InvokeDynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        }))
    }

    fn parse_ref_info(&mut self) -> Result<RefInfo> {
        let class_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }

    fn parse_attribute(&mut self) -> Result<RawAttribute> {
        let attribute_name_index = self.read_u16()?;
        let attribute_length = self.read_u32()?;
        let mut info = vec![0u8; attribute_length as usize];
        self.r.read_exact(&mut info)?;

        Ok(RawAttribute {
            attribute_name_index,
            info,
        })
    }

    /// Reads an attribute table verbatim, without interpreting any payload.
    pub fn parse_raw_attributes(&mut self) -> Result<Vec<RawAttribute>> {
        let attributes_count = self.read_u16()?;
        (0..attributes_count)
            .map(|_| self.parse_attribute())
            .collect()
    }

    pub fn parse_attributes(&mut self, constant_pool: &ConstantPool) -> Result<Attributes> {
        self.parse_nested_attributes(constant_pool, 0)
    }

    fn parse_nested_attributes(
        &mut self,
        constant_pool: &ConstantPool,
        depth: usize,
    ) -> Result<Attributes> {
        self.parse_raw_attributes()?
            .into_iter()
            .map(|raw| Attribute::resolve_nested(raw, constant_pool, depth))
            .collect::<Result<Vec<_>>>()
            .map(Attributes)
    }

    /// Reads the payload of a `Code` attribute, including its nested table.
    pub fn parse_code_attribute(&mut self, constant_pool: &ConstantPool) -> Result<CodeAttribute> {
        self.parse_nested_code_attribute(constant_pool, 1)
    }

    /// `depth` counts this attribute and the `Code` attributes enclosing it.
    pub(crate) fn parse_nested_code_attribute(
        &mut self,
        constant_pool: &ConstantPool,
        depth: usize,
    ) -> Result<CodeAttribute> {
        let max_stack = self.read_u16()?;
        let max_locals = self.read_u16()?;
        let code_length = self.read_u32()?;
        let mut code = vec![0u8; code_length as usize];
        self.r.read_exact(&mut code)?;
        let exception_table_length = self.read_u16()?;
        let exception_table = (0..exception_table_length)
            .map(|_| self.parse_exception_table_entry())
            .collect::<Result<Vec<_>>>()?;
        let attributes = self.parse_nested_attributes(constant_pool, depth)?;

        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    fn parse_exception_table_entry(&mut self) -> Result<ExceptionTableEntry> {
        let start_pc = self.read_u16()?;
        let end_pc = self.read_u16()?;
        let handler_pc = self.read_u16()?;
        let catch_type = self.read_u16()?;

        Ok(ExceptionTableEntry {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        })
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        Ok(self.r.read_u32::<Endian>()?)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        Ok(self.r.read_u16::<Endian>()?)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.r.read_u8()?)
    }
}
