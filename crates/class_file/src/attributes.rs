use std::{borrow::Cow, fmt, io::Cursor};

use crate::{parser::Parser, ClassFileError, ConstantPool, Result};

/// How many `Code` attributes may enclose one another. Valid class files
/// never nest them at all.
pub const MAX_CODE_NESTING: usize = 4;

/// An attribute record as read from the class file, before its name has
/// been looked up in the constant pool.
#[derive(Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub attribute_name_index: u16,
    pub info: Vec<u8>,
}
impl fmt::Debug for RawAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawAttribute")
            .field("attribute_name_index", &self.attribute_name_index)
            .field("info", &format!("({} bytes)", self.info.len()))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub attribute_name_index: u16,
    pub info: AttributeInfo,
}
impl Attribute {
    /// Adds `name` to the constant pool and wraps `info` in an attribute
    /// referring to it.
    pub fn new(constant_pool: &mut ConstantPool, name: &str, info: AttributeInfo) -> Result<Self> {
        Ok(Self {
            attribute_name_index: constant_pool.create_utf8(name)?,
            info,
        })
    }

    /// Interprets the payload of `raw` according to its name.
    ///
    /// Attributes whose name is unknown, or whose name index doesn't lead to a
    /// `Utf8` constant, are kept as [`AttributeInfo::Unknown`].
    pub fn resolve(raw: RawAttribute, constant_pool: &ConstantPool) -> Result<Self> {
        Self::resolve_nested(raw, constant_pool, 0)
    }

    /// `depth` is the number of `Code` attributes enclosing `raw`.
    pub(crate) fn resolve_nested(
        raw: RawAttribute,
        constant_pool: &ConstantPool,
        depth: usize,
    ) -> Result<Self> {
        let RawAttribute {
            attribute_name_index,
            info,
        } = raw;

        let info = match constant_pool.utf8(attribute_name_index) {
            Ok(b"ConstantValue") => parse_exact("ConstantValue", &info, |p| {
                Ok(AttributeInfo::ConstantValue {
                    constantvalue_index: p.read_u16()?,
                })
            })?,
            Ok(b"Code") if depth >= MAX_CODE_NESTING => {
                return Err(ClassFileError::MalformedAttribute {
                    name: "Code",
                    reason: format!("nested more than {} levels deep", MAX_CODE_NESTING),
                })
            }
            Ok(b"Code") => parse_exact("Code", &info, |p| {
                p.parse_nested_code_attribute(constant_pool, depth + 1)
                    .map(AttributeInfo::Code)
            })?,
            Ok(b"Exceptions") => parse_exact("Exceptions", &info, |p| {
                let number_of_exceptions = p.read_u16()?;
                let exception_index_table = (0..number_of_exceptions)
                    .map(|_| p.read_u16())
                    .collect::<Result<Vec<_>>>()?;

                Ok(AttributeInfo::Exceptions {
                    exception_index_table,
                })
            })?,
            _ => {
                log::trace!(
                    "Keeping attribute #{} as {} opaque bytes",
                    attribute_name_index,
                    info.len()
                );
                AttributeInfo::Unknown(info)
            }
        };

        Ok(Self {
            attribute_name_index,
            info,
        })
    }

    pub fn name<'a>(&self, constant_pool: &'a ConstantPool) -> Result<Cow<'a, str>> {
        constant_pool.utf8_str(self.attribute_name_index)
    }
}

fn parse_exact<'a, T>(
    name: &'static str,
    info: &'a [u8],
    parse: impl FnOnce(&mut Parser<Cursor<&'a [u8]>>) -> Result<T>,
) -> Result<T> {
    let mut parser = Parser::new(Cursor::new(info));
    let value = parse(&mut parser).map_err(|e| {
        if e.is_eof() {
            ClassFileError::MalformedAttribute {
                name,
                reason: format!("{} bytes are not enough", info.len()),
            }
        } else {
            e
        }
    })?;

    let consumed = parser.into_inner().position() as usize;
    if consumed != info.len() {
        return Err(ClassFileError::MalformedAttribute {
            name,
            reason: format!("{} trailing bytes", info.len() - consumed),
        });
    }

    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeInfo {
    ConstantValue { constantvalue_index: u16 },
    Code(CodeAttribute),
    Exceptions { exception_index_table: Vec<u16> },
    /// Payload of an attribute that isn't modelled, kept verbatim.
    Unknown(Vec<u8>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(pub Vec<Attribute>);
impl Attributes {
    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.0.push(attribute);
    }

    pub fn find_by_name(&self, name: &str, constant_pool: &ConstantPool) -> Option<&Attribute> {
        self.0.iter().find(|a| {
            constant_pool
                .utf8(a.attribute_name_index)
                .map_or(false, |s| s == name.as_bytes())
        })
    }

    pub fn code_attribute(&self) -> Option<&CodeAttribute> {
        self.0.iter().find_map(|a| match &a.info {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn constant_value(&self) -> Option<u16> {
        self.0.iter().find_map(|a| match a.info {
            AttributeInfo::ConstantValue {
                constantvalue_index,
            } => Some(constantvalue_index),
            _ => None,
        })
    }

    pub fn exceptions(&self) -> Option<&[u16]> {
        self.0.iter().find_map(|a| match &a.info {
            AttributeInfo::Exceptions {
                exception_index_table,
            } => Some(exception_index_table.as_slice()),
            _ => None,
        })
    }
}
impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Attributes,
}
