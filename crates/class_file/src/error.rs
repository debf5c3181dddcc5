use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("Malformed constant pool: {0}")]
    MalformedConstantPool(String),
    #[error("Invalid constant pool index {index}, expected {expected}")]
    InvalidConstantIndex { index: u16, expected: &'static str },
    #[error("Malformed {name} attribute: {reason}")]
    MalformedAttribute { name: &'static str, reason: String },
}

impl ClassFileError {
    pub(crate) fn is_eof(&self) -> bool {
        matches!(self, ClassFileError::IOError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}
