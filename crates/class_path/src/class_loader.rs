use std::{path::Path, sync::Arc};

use cafe_class_file::ClassFile;
use indexmap::IndexMap;

use crate::{
    source::{self, FsOpener, Locator, Opener},
    ClassPathError, Result,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLoaderOptions {
    /// Whether symbolic links are followed when traversing directories.
    pub follow_symlinks: bool,
    /// How many levels of sub-directories are traversed, `None` for no limit.
    pub maximum_depth: Option<usize>,
    /// How many parsed class files are kept. 0 disables the cache.
    pub max_cache: usize,
}
impl Default for ClassLoaderOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            maximum_depth: Some(20),
            max_cache: 50,
        }
    }
}

/// Emulates a Java classpath.
///
/// Directories and archives are registered up front, which records every
/// file they contain under its path relative to the root. Classes are then
/// loaded by that path, with or without the `.class` suffix, and the most
/// recently used ones are kept parsed.
///
/// The loader isn't synchronized, share it behind a lock if needed.
pub struct ClassLoader<O = FsOpener> {
    options: ClassLoaderOptions,
    opener: O,
    path_map: IndexMap<String, Locator>,
    // Least recently used first.
    class_cache: IndexMap<String, Arc<ClassFile>>,
}

impl ClassLoader {
    pub fn new() -> Self {
        Self::with_options(ClassLoaderOptions::default())
    }

    pub fn with_options(options: ClassLoaderOptions) -> Self {
        Self::with_opener(options, FsOpener)
    }
}

impl Default for ClassLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Opener> ClassLoader<O> {
    pub fn with_opener(options: ClassLoaderOptions, opener: O) -> Self {
        Self {
            options,
            opener,
            path_map: IndexMap::new(),
            class_cache: IndexMap::new(),
        }
    }

    pub fn options(&self) -> &ClassLoaderOptions {
        &self.options
    }

    /// Adds a directory or a `.jar`/`.zip` archive to the classpath.
    ///
    /// Paths that are neither are skipped. Resources already known from an
    /// earlier registration keep their original location.
    pub fn register(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if source::is_archive(path) {
            let entries = source::archive_entries(path)?;
            log::debug!("Registering {} entries of {}", entries.len(), path.display());
            for entry in entries {
                let locator = Locator::Archive {
                    archive: path.to_path_buf(),
                    entry: entry.clone(),
                };
                self.register_entry(entry, locator);
            }
        } else if path.is_dir() {
            let files = source::walk_directory(
                path,
                self.options.follow_symlinks,
                self.options.maximum_depth,
            )?;
            log::debug!("Registering {} files below {}", files.len(), path.display());
            for (key, full_path) in files {
                self.register_entry(key, Locator::File(full_path));
            }
        } else {
            log::warn!(
                "Skipping {}, it's neither a directory nor an archive",
                path.display()
            );
        }

        Ok(())
    }

    /// Registers every path in order, stopping at the first failure.
    pub fn register_all<P: AsRef<Path>>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
    ) -> Result<()> {
        paths.into_iter().try_for_each(|p| self.register(p))
    }

    /// Maps `key` to `locator` unless `key` is already registered.
    ///
    /// Returns whether the mapping was added.
    pub fn register_entry(&mut self, key: impl Into<String>, locator: Locator) -> bool {
        let key = key.into();
        if self.path_map.contains_key(&key) {
            log::debug!("{} is already registered, keeping the first location", key);
            return false;
        }

        self.path_map.insert(key, locator);
        true
    }

    pub fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// Registered resource paths, in registration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.path_map.keys().map(String::as_str)
    }

    pub fn class_paths(&self) -> impl Iterator<Item = &str> {
        self.paths().filter(|p| p.ends_with(".class"))
    }

    pub fn cached_len(&self) -> usize {
        self.class_cache.len()
    }

    /// Loads and parses the class file registered as `path` or `path.class`.
    pub fn load(&mut self, path: &str) -> Result<Arc<ClassFile>> {
        let (key, locator) = self
            .resolve(path)
            .map(|(key, locator)| (key.to_owned(), locator.clone()))?;

        if let Some(class_file) = self.class_cache.shift_remove(&key) {
            log::debug!("Cache hit for {}", key);
            self.class_cache.insert(key, Arc::clone(&class_file));
            return Ok(class_file);
        }

        log::debug!("Cache miss for {}, reading {:?}", key, locator);
        let bytes = self.opener.open(&locator)?;
        let class_file = Arc::new(ClassFile::from_bytes(&bytes)?);

        if self.options.max_cache > 0 {
            self.class_cache.insert(key, Arc::clone(&class_file));

            let excess = self
                .class_cache
                .len()
                .saturating_sub(self.options.max_cache);
            for (evicted, _) in self.class_cache.drain(..excess) {
                log::debug!("Evicting {} from the class cache", evicted);
            }
        }

        Ok(class_file)
    }

    /// Reads the raw bytes of any registered resource, bypassing the cache.
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let (_, locator) = self.resolve(path)?;
        self.opener.open(locator)
    }

    /// Forgets every registered path and every cached class.
    pub fn clear(&mut self) {
        self.path_map.clear();
        self.class_cache.clear();
    }

    fn resolve(&self, path: &str) -> Result<(&str, &Locator)> {
        if let Some((key, locator)) = self.path_map.get_key_value(path) {
            return Ok((key.as_str(), locator));
        }

        self.path_map
            .get_key_value(format!("{path}.class").as_str())
            .map(|(key, locator)| (key.as_str(), locator))
            .ok_or_else(|| ClassPathError::ResourceNotFound(path.to_owned()))
    }
}
