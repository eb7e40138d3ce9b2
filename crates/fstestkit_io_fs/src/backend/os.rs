//! Host filesystem implementation backed by `std::fs`.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use super::traits::{DirEntry, FileSystem, FileType, FileWrite, Metadata};

/// The host filesystem. Paths are used as given (relative paths resolve
/// against the process working directory).
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl OsFs {
    /// Create a handle to the host filesystem.
    pub fn new() -> Self {
        Self
    }
}

fn convert_metadata(meta: &fs::Metadata) -> Metadata {
    let cfg_file_type = meta.file_type();
    let file_type = if cfg_file_type.is_symlink() {
        FileType::Symlink
    } else if cfg_file_type.is_dir() {
        FileType::Directory
    } else if cfg_file_type.is_file() {
        FileType::File
    } else {
        FileType::Other
    };
    let size = if file_type.is_file() { meta.len() } else { 0 };

    Metadata {
        file_type,
        size,
        mode: mode_of(meta),
    }
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &fs::Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, true) => 0o555,
        (true, false) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

impl FileSystem for OsFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut l_entries = Vec::new();
        for entry_res in fs::read_dir(path)? {
            let entry = entry_res?;
            let meta = fs::symlink_metadata(entry.path())?;
            l_entries.push(DirEntry {
                name: entry.file_name(),
                metadata: convert_metadata(&meta),
            });
        }
        l_entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(l_entries)
    }

    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        fs::symlink_metadata(path).map(|meta| convert_metadata(&meta))
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(fs::File::open(path)?))
    }

    fn create_new(&self, path: &Path) -> io::Result<Box<dyn FileWrite + '_>> {
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        Ok(Box::new(file))
    }

    #[cfg(unix)]
    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(mode).create(path)
    }

    #[cfg(not(unix))]
    fn mkdir_all(&self, path: &Path, _mode: u32) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    #[cfg(unix)]
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_readonly(mode & 0o222 == 0);
        fs::set_permissions(path, permissions)
    }
}
