use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;
use zip::ZipArchive;

use crate::Result;

/// Upper bound on the buffer reserved from an archive entry's declared size.
/// The header is untrusted, reads past this grow the buffer as usual.
const MAX_PREALLOCATION: u64 = 1 << 20;

/// Where the bytes of a registered resource live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    File(PathBuf),
    Archive { archive: PathBuf, entry: String },
}

/// Reads the complete contents of a resource.
///
/// Any handle opened to do so must be closed before returning.
pub trait Opener {
    fn open(&self, locator: &Locator) -> Result<Vec<u8>>;
}

impl<F> Opener for F
where
    F: Fn(&Locator) -> Result<Vec<u8>>,
{
    fn open(&self, locator: &Locator) -> Result<Vec<u8>> {
        self(locator)
    }
}

/// Opens plain files and entries of zip archives on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsOpener;

impl Opener for FsOpener {
    fn open(&self, locator: &Locator) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        match locator {
            Locator::File(path) => {
                File::open(path)?.read_to_end(&mut bytes)?;
            }
            Locator::Archive { archive, entry } => {
                let mut archive = ZipArchive::new(File::open(archive)?)?;
                let mut file = archive.by_name(entry)?;
                bytes.reserve(preallocation(file.size()));
                file.read_to_end(&mut bytes)?;
            }
        }
        Ok(bytes)
    }
}

fn preallocation(declared_size: u64) -> usize {
    declared_size.min(MAX_PREALLOCATION) as usize
}

pub(crate) fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| {
            e.eq_ignore_ascii_case("jar") || e.eq_ignore_ascii_case("zip")
        })
}

/// Names of the file entries in the archive at `path`, in archive order.
pub(crate) fn archive_entries(path: &Path) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let file = archive.by_index_raw(i)?;
        if !file.is_dir() {
            entries.push(file.name().to_owned());
        }
    }
    Ok(entries)
}

/// Files below `root` as `(relative path, full path)` pairs, with relative
/// paths always separated by `/`.
///
/// A `maximum_depth` of 0 only lists the files directly inside `root`.
pub(crate) fn walk_directory(
    root: &Path,
    follow_symlinks: bool,
    maximum_depth: Option<usize>,
) -> Result<Vec<(String, PathBuf)>> {
    let mut walker = WalkDir::new(root)
        .follow_links(follow_symlinks)
        .sort_by_file_name();
    if let Some(maximum_depth) = maximum_depth {
        walker = walker.max_depth(maximum_depth.saturating_add(1));
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };

        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((key, entry.into_path()));
    }

    Ok(files)
}
