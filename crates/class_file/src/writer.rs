use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::{
    attributes::{Attribute, AttributeInfo, Attributes, CodeAttribute, ExceptionTableEntry},
    class_file::{FieldInfo, MethodInfo},
    constant_pool::RefInfo,
    AccessFlags, ClassFile, ClassFileError, ConstantPool, CpInfo, Result, MAGIC_IDENTIFIER,
};

type Endian = BigEndian;

/// Serializes class files, the mirror image of [`crate::Parser`].
pub struct Writer<W> {
    w: W,
}
impl<W: Write> Writer<W> {
    pub fn new(w: W) -> Self {
        Self { w }
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    pub fn write(&mut self, class_file: &ClassFile) -> Result<()> {
        let (major, minor) = class_file.version;

        self.write_u32(MAGIC_IDENTIFIER)?;
        self.write_u16(minor)?;
        self.write_u16(major)?;
        self.write_constant_pool(&class_file.constant_pool)?;
        self.write_access_flags(class_file.access_flags)?;
        self.write_u16(class_file.this_class)?;
        self.write_u16(class_file.super_class)?;

        self.write_count(class_file.interfaces.len(), "interfaces")?;
        for interface in &class_file.interfaces {
            self.write_u16(*interface)?;
        }

        self.write_count(class_file.fields.len(), "fields")?;
        for field in &class_file.fields {
            self.write_field_info(field)?;
        }

        self.write_count(class_file.methods.len(), "methods")?;
        for method in &class_file.methods {
            self.write_method_info(method)?;
        }

        self.write_attributes(&class_file.attributes)
    }

    pub fn write_constant_pool(&mut self, constant_pool: &ConstantPool) -> Result<()> {
        self.write_u16(constant_pool.count()?)?;

        for cp_info in constant_pool.slots() {
            let Some(tag) = cp_info.tag() else {
                continue;
            };
            self.write_u8(tag)?;

            match cp_info {
                CpInfo::Utf8(bytes) => {
                    let length = u16::try_from(bytes.len()).map_err(|_| {
                        ClassFileError::MalformedConstantPool(format!(
                            "Utf8 constant of {} bytes is too long",
                            bytes.len()
                        ))
                    })?;
                    self.write_u16(length)?;
                    self.w.write_all(bytes)?;
                }
                CpInfo::Integer(int) => self.w.write_i32::<Endian>(*int)?,
                CpInfo::Float(float) => self.w.write_f32::<Endian>(*float)?,
                CpInfo::Long(long) => self.w.write_i64::<Endian>(*long)?,
                CpInfo::Double(double) => self.w.write_f64::<Endian>(*double)?,
                CpInfo::Class(class_info) => self.write_u16(class_info.name_index)?,
                CpInfo::String { string_index } => self.write_u16(*string_index)?,
                CpInfo::FieldRef(ref_info)
                | CpInfo::MethodRef(ref_info)
                | CpInfo::InterfaceMethodRef(ref_info) => self.write_ref_info(ref_info)?,
                CpInfo::NameAndType(name_and_type) => {
                    self.write_u16(name_and_type.name_index)?;
                    self.write_u16(name_and_type.descriptor_index)?;
                }
                CpInfo::MethodHandle(method_handle) => {
                    self.write_u8(method_handle.reference_kind)?;
                    self.write_u16(method_handle.reference_index)?;
                }
                CpInfo::MethodType(method_type) => self.write_u16(method_type.descriptor_index)?,
                CpInfo::InvokeDynamic(invoke_dynamic) => {
                    self.write_u16(invoke_dynamic.bootstrap_method_attr_index)?;
                    self.write_u16(invoke_dynamic.name_and_type_index)?;
                }
                CpInfo::Padding => {}
            }
        }

        Ok(())
    }

    fn write_ref_info(&mut self, ref_info: &RefInfo) -> Result<()> {
        self.write_u16(ref_info.class_index)?;
        self.write_u16(ref_info.name_and_type_index)
    }

    fn write_field_info(&mut self, field: &FieldInfo) -> Result<()> {
        self.write_access_flags(field.access_flags)?;
        self.write_u16(field.name_index)?;
        self.write_u16(field.descriptor_index)?;
        self.write_attributes(&field.attributes)
    }

    fn write_method_info(&mut self, method: &MethodInfo) -> Result<()> {
        self.write_access_flags(method.access_flags)?;
        self.write_u16(method.name_index)?;
        self.write_u16(method.descriptor_index)?;
        self.write_attributes(&method.attributes)
    }

    pub fn write_attributes(&mut self, attributes: &Attributes) -> Result<()> {
        self.write_count(attributes.len(), "attributes")?;
        attributes.iter().try_for_each(|a| self.write_attribute(a))
    }

    fn write_attribute(&mut self, attribute: &Attribute) -> Result<()> {
        let info = encode_attribute_info(&attribute.info)?;
        let attribute_length = u32::try_from(info.len()).map_err(|_| {
            ClassFileError::IOError(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("attribute of {} bytes is too long", info.len()),
            ))
        })?;

        self.write_u16(attribute.attribute_name_index)?;
        self.write_u32(attribute_length)?;
        self.w.write_all(&info)?;
        Ok(())
    }

    pub fn write_code_attribute(&mut self, code: &CodeAttribute) -> Result<()> {
        let code_length = u32::try_from(code.code.len()).map_err(|_| {
            ClassFileError::IOError(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("code of {} bytes is too long", code.code.len()),
            ))
        })?;

        self.write_u16(code.max_stack)?;
        self.write_u16(code.max_locals)?;
        self.write_u32(code_length)?;
        self.w.write_all(&code.code)?;

        self.write_count(code.exception_table.len(), "exception table entries")?;
        for entry in &code.exception_table {
            self.write_exception_table_entry(entry)?;
        }

        self.write_attributes(&code.attributes)
    }

    fn write_exception_table_entry(&mut self, entry: &ExceptionTableEntry) -> Result<()> {
        self.write_u16(entry.start_pc)?;
        self.write_u16(entry.end_pc)?;
        self.write_u16(entry.handler_pc)?;
        self.write_u16(entry.catch_type)
    }

    fn write_access_flags(&mut self, access_flags: AccessFlags) -> Result<()> {
        self.write_u16(access_flags.bits())
    }

    fn write_count(&mut self, len: usize, what: &str) -> Result<()> {
        let count = u16::try_from(len).map_err(|_| {
            ClassFileError::IOError(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("too many {what}: {len}"),
            ))
        })?;
        self.write_u16(count)
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        Ok(self.w.write_u32::<Endian>(value)?)
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        Ok(self.w.write_u16::<Endian>(value)?)
    }

    fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(self.w.write_u8(value)?)
    }
}

/// Encodes the payload of an attribute, without its name and length.
pub(crate) fn encode_attribute_info(info: &AttributeInfo) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    match info {
        AttributeInfo::ConstantValue {
            constantvalue_index,
        } => writer.write_u16(*constantvalue_index)?,
        AttributeInfo::Code(code) => writer.write_code_attribute(code)?,
        AttributeInfo::Exceptions {
            exception_index_table,
        } => {
            writer.write_count(exception_index_table.len(), "exceptions")?;
            for index in exception_index_table {
                writer.write_u16(*index)?;
            }
        }
        AttributeInfo::Unknown(bytes) => return Ok(bytes.clone()),
    }
    Ok(writer.into_inner())
}
