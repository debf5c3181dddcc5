use std::{
    borrow::Cow,
    io::{Cursor, Read, Write},
};

use crate::{
    attributes::Attributes, parser::Parser, AccessFlags, ConstantPool, ParseMode, Result, Writer,
};

/// Java SE 6, the version given to class files made by [`ClassFile::create`].
pub const DEFAULT_VERSION: (u16, u16) = (50, 0);

const VERSION_NAMES: [(u16, &str); 7] = [
    (0x2D, "JDK 1.1"),
    (0x2E, "JDK 1.2"),
    (0x2F, "JDK 1.3"),
    (0x30, "JDK 1.4"),
    (0x31, "J2SE 5.0"),
    (0x32, "J2SE 6.0"),
    (0x33, "J2SE 7"),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassFile {
    /// `(major, minor)`, the reverse of the on-disk order.
    pub version: (u16, u16),
    pub constant_pool: ConstantPool,
    pub access_flags: AccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Attributes,
}
impl ClassFile {
    pub fn parse(bytes: impl Read) -> Result<ClassFile> {
        Parser::new(bytes).parse()
    }

    pub fn parse_with_mode(bytes: impl Read, mode: ParseMode) -> Result<ClassFile> {
        Parser::new(bytes).with_mode(mode).parse()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<ClassFile> {
        Self::parse(Cursor::new(bytes))
    }

    pub fn write(&self, w: impl Write) -> Result<()> {
        Writer::new(w).write(self)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer.write(self)?;
        Ok(writer.into_inner())
    }

    /// Starts a new, empty public class named `this_class`, extending
    /// `super_class` or `java/lang/Object`.
    pub fn create(this_class: &str, super_class: Option<&str>) -> Result<ClassFile> {
        let mut constant_pool = ConstantPool::default();
        let this_class = constant_pool.create_class(this_class)?;
        let super_class = constant_pool.create_class(super_class.unwrap_or("java/lang/Object"))?;

        Ok(ClassFile {
            version: DEFAULT_VERSION,
            constant_pool,
            access_flags: AccessFlags::PUBLIC | AccessFlags::SUPER,
            this_class,
            super_class,
            ..ClassFile::default()
        })
    }

    pub fn major_version(&self) -> u16 {
        self.version.0
    }

    pub fn minor_version(&self) -> u16 {
        self.version.1
    }

    /// The JDK release that introduced the major version, if it's a known one.
    pub fn version_name(&self) -> Option<&'static str> {
        VERSION_NAMES
            .iter()
            .find(|(major, _)| *major == self.major_version())
            .map(|(_, name)| *name)
    }

    pub fn class_name(&self) -> Result<Cow<'_, str>> {
        self.constant_pool.class_name(self.this_class)
    }

    pub fn super_class(&self) -> Result<Option<Cow<'_, str>>> {
        // Only java/lang/Object has no direct superclass.
        if self.super_class == 0 {
            return Ok(None);
        }

        self.constant_pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> Result<Vec<Cow<'_, str>>> {
        self.interfaces
            .iter()
            .map(|i| self.constant_pool.class_name(*i))
            .collect()
    }

    pub fn field_name(&self, field: &FieldInfo) -> Result<Cow<'_, str>> {
        self.constant_pool.utf8_str(field.name_index)
    }

    pub fn field_descriptor(&self, field: &FieldInfo) -> Result<Cow<'_, str>> {
        self.constant_pool.utf8_str(field.descriptor_index)
    }

    pub fn method_name(&self, method: &MethodInfo) -> Result<Cow<'_, str>> {
        self.constant_pool.utf8_str(method.name_index)
    }

    pub fn method_descriptor(&self, method: &MethodInfo) -> Result<Cow<'_, str>> {
        self.constant_pool.utf8_str(method.descriptor_index)
    }

    pub fn add_interface(&mut self, name: &str) -> Result<u16> {
        let index = self.constant_pool.create_class(name)?;
        self.interfaces.push(index);
        Ok(index)
    }

    pub fn add_field(
        &mut self,
        access_flags: AccessFlags,
        name: &str,
        descriptor: &str,
    ) -> Result<&mut FieldInfo> {
        let name_index = self.constant_pool.create_utf8(name)?;
        let descriptor_index = self.constant_pool.create_utf8(descriptor)?;

        self.fields.push(FieldInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes: Attributes::default(),
        });
        let index = self.fields.len() - 1;
        Ok(&mut self.fields[index])
    }

    pub fn add_method(
        &mut self,
        access_flags: AccessFlags,
        name: &str,
        descriptor: &str,
    ) -> Result<&mut MethodInfo> {
        let name_index = self.constant_pool.create_utf8(name)?;
        let descriptor_index = self.constant_pool.create_utf8(descriptor)?;

        self.methods.push(MethodInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes: Attributes::default(),
        });
        let index = self.methods.len() - 1;
        Ok(&mut self.methods[index])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}
