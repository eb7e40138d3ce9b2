//! Filesystem trait definitions

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::Path;

/// Synchronous filesystem seam used by the differ and the copier.
///
/// Implementations must list directories in name order and must not follow
/// symlinks in [`FileSystem::stat`]; both engines rely on that to compare
/// listings positionally and to reject links.
pub trait FileSystem: Send + Sync {
    /// Read directory entries, sorted by name.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Get metadata for a path without following a trailing symlink.
    fn stat(&self, path: &Path) -> io::Result<Metadata>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> io::Result<bool> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Open a regular file for sequential reads.
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + '_>>;

    /// Create a regular file for writing. Fails if `path` exists.
    fn create_new(&self, path: &Path) -> io::Result<Box<dyn FileWrite + '_>>;

    /// Create a directory and any missing parents.
    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Change permission bits.
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// Writable file handle with a durable close.
pub trait FileWrite: Write {
    /// Flush buffered bytes and make them durable.
    fn sync_all(&mut self) -> io::Result<()>;
}

impl FileWrite for std::fs::File {
    fn sync_all(&mut self) -> io::Result<()> {
        std::fs::File::sync_all(self)
    }
}

/// File metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// File type
    pub file_type: FileType,
    /// File size in bytes (0 for directories)
    pub size: u64,
    /// Permission bits (masked with `0o7777`)
    pub mode: u32,
}

/// File type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// FIFO, socket or device node
    Other,
}

impl FileType {
    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }

    /// Check if this is a FIFO, socket or device node.
    pub fn is_other(&self) -> bool {
        matches!(self, FileType::Other)
    }

    /// Short lowercase name used in diff details.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Directory => "directory",
            FileType::Symlink => "symlink",
            FileType::Other => "special file",
        }
    }
}

/// Directory entry.
///
/// Names are compared and joined as raw [`OsString`]s; lossy UTF-8 is only
/// used to match exclude patterns and to render diff details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (not full path), exactly as the filesystem stores it
    pub name: OsString,
    /// Entry metadata
    pub metadata: Metadata,
}
