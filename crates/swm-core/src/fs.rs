//! Filesystem capability handed to the scanner and the provisioner.
//!
//! Only the handful of operations the index needs are exposed, so tests can
//! swap in an in-memory tree instead of touching the disk.

use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

pub trait Fs: Send + Sync {
    /// Immediate children of `path`. A missing directory is `ErrorKind::NotFound`.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// True when `path` exists as a file or a directory.
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl Fs for OsFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::debug!(path = %entry.path().display(), "skipping non UTF-8 entry");
                continue;
            };
            entries.push(DirEntry {
                name,
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
