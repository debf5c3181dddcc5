// A classpath over directories and jar/zip archives, caching parsed class files.

mod class_loader;
mod error;
mod source;

pub use class_loader::{ClassLoader, ClassLoaderOptions};
pub use error::ClassPathError;
pub use source::{FsOpener, Locator, Opener};

pub type Result<T, E = ClassPathError> = std::result::Result<T, E>;
