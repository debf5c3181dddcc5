use cafe_class_file::ClassFileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassPathError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    ZipError(#[from] zip::result::ZipError),
    #[error(transparent)]
    WalkDirError(#[from] walkdir::Error),
    #[error(transparent)]
    ClassFileError(#[from] ClassFileError),
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
}
