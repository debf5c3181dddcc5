// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html

#[macro_use]
pub mod constant_pool;
mod access_flags;
pub mod attributes;
mod class_file;
mod error;
mod parser;
mod writer;

pub use self::class_file::{ClassFile, FieldInfo, MethodInfo};
pub use access_flags::AccessFlags;
pub use attributes::{Attribute, AttributeInfo, Attributes};
pub use constant_pool::{ConstantPool, CpInfo};
pub use error::ClassFileError;
pub use parser::{ParseMode, Parser};
pub use writer::Writer;

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;

pub const MAGIC_IDENTIFIER: u32 = 0xCAFEBABE;
