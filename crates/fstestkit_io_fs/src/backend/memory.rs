//! In-memory filesystem implementation

use std::collections::BTreeMap;
use std::ops::Bound;
use std::io::{self, Cursor, Error as IoError, ErrorKind, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::traits::{DirEntry, FileSystem, FileType, FileWrite, Metadata};

const N_MODE_FILE_DEFAULT: u32 = 0o644;
const N_MODE_DIR_DEFAULT: u32 = 0o755;

/// In-memory filesystem.
///
/// Stores all files and directories in a map keyed by normalized absolute
/// path. Relative paths are resolved against `/`.
#[derive(Debug)]
pub struct MemFs {
    entries: RwLock<BTreeMap<PathBuf, MemNode>>,
}

#[derive(Debug, Clone)]
enum MemNode {
    File { content: Vec<u8>, mode: u32 },
    Directory { mode: u32 },
    Symlink { target: PathBuf },
}

impl MemNode {
    fn metadata(&self) -> Metadata {
        match self {
            MemNode::File { content, mode } => Metadata {
                file_type: FileType::File,
                size: content.len() as u64,
                mode: *mode,
            },
            MemNode::Directory { mode } => Metadata {
                file_type: FileType::Directory,
                size: 0,
                mode: *mode,
            },
            MemNode::Symlink { target } => Metadata {
                file_type: FileType::Symlink,
                size: target.as_os_str().len() as u64,
                mode: 0o777,
            },
        }
    }
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFs {
    /// Create an empty filesystem holding only `/`.
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            PathBuf::from("/"),
            MemNode::Directory {
                mode: N_MODE_DIR_DEFAULT,
            },
        );
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Write `content` to `path`, replacing any file there and creating
    /// missing parent directories with mode `0o755`.
    pub fn write_file<P: AsRef<Path>>(&self, path: P, content: &[u8], mode: u32) -> io::Result<()> {
        let path = normalize_path(path.as_ref());
        if let Some(parent) = path.parent() {
            self.mkdir_all(parent, N_MODE_DIR_DEFAULT)?;
        }

        let mut entries = self.lock_write()?;
        if let Some(MemNode::Directory { .. }) = entries.get(&path) {
            return Err(IoError::new(ErrorKind::IsADirectory, "is a directory"));
        }
        entries.insert(
            path,
            MemNode::File {
                content: content.to_vec(),
                mode: mode & 0o7777,
            },
        );
        Ok(())
    }

    /// Read the whole content of a regular file.
    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> io::Result<Vec<u8>> {
        let path = normalize_path(path.as_ref());
        let entries = self.lock_read()?;
        match entries.get(&path) {
            Some(MemNode::File { content, .. }) => Ok(content.clone()),
            Some(MemNode::Directory { .. }) => {
                Err(IoError::new(ErrorKind::IsADirectory, "is a directory"))
            }
            Some(MemNode::Symlink { .. }) | None => {
                Err(IoError::new(ErrorKind::NotFound, "file not found"))
            }
        }
    }

    /// Create a symbolic link at `link` pointing to `target`.
    pub fn symlink<P: AsRef<Path>, Q: AsRef<Path>>(&self, target: P, link: Q) -> io::Result<()> {
        let link = normalize_path(link.as_ref());
        let mut entries = self.lock_write()?;
        ensure_parent_dir(&entries, &link)?;
        if entries.contains_key(&link) {
            return Err(IoError::new(ErrorKind::AlreadyExists, "file exists"));
        }
        entries.insert(
            link,
            MemNode::Symlink {
                target: target.as_ref().to_path_buf(),
            },
        );
        Ok(())
    }

    fn lock_read(&self) -> io::Result<RwLockReadGuard<'_, BTreeMap<PathBuf, MemNode>>> {
        self.entries
            .read()
            .map_err(|_| IoError::other("in-memory filesystem lock poisoned"))
    }

    fn lock_write(&self) -> io::Result<RwLockWriteGuard<'_, BTreeMap<PathBuf, MemNode>>> {
        self.entries
            .write()
            .map_err(|_| IoError::other("in-memory filesystem lock poisoned"))
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::from("/");

    for component in path.components() {
        match component {
            Component::Normal(name) => result.push(name),
            Component::ParentDir => {
                result.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }

    result
}

fn ensure_parent_dir(entries: &BTreeMap<PathBuf, MemNode>, path: &Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Err(IoError::new(ErrorKind::AlreadyExists, "file exists"));
    };
    match entries.get(parent) {
        Some(MemNode::Directory { .. }) => Ok(()),
        Some(_) => Err(IoError::new(ErrorKind::NotADirectory, "not a directory")),
        None => Err(IoError::new(
            ErrorKind::NotFound,
            "parent directory not found",
        )),
    }
}

impl FileSystem for MemFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let path = normalize_path(path);
        let entries = self.lock_read()?;

        match entries.get(&path) {
            Some(MemNode::Directory { .. }) => {}
            Some(_) => return Err(IoError::new(ErrorKind::NotADirectory, "not a directory")),
            None => return Err(IoError::new(ErrorKind::NotFound, "directory not found")),
        }

        // Keys order component-wise, so a directory's descendants follow it
        // contiguously and its children come out in name order.
        let l_entries: Vec<DirEntry> = entries
            .range::<Path, _>((Bound::Excluded(path.as_path()), Bound::Unbounded))
            .take_while(|(path_entry, _)| path_entry.starts_with(&path))
            .filter(|(path_entry, _)| path_entry.parent() == Some(path.as_path()))
            .filter_map(|(path_entry, node)| {
                Some(DirEntry {
                    name: path_entry.file_name()?.to_os_string(),
                    metadata: node.metadata(),
                })
            })
            .collect();
        Ok(l_entries)
    }

    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        let path = normalize_path(path);
        let entries = self.lock_read()?;
        entries
            .get(&path)
            .map(MemNode::metadata)
            .ok_or_else(|| IoError::new(ErrorKind::NotFound, "file not found"))
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        let content = self.read_file(path)?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn create_new(&self, path: &Path) -> io::Result<Box<dyn FileWrite + '_>> {
        let path = normalize_path(path);
        let mut entries = self.lock_write()?;
        ensure_parent_dir(&entries, &path)?;
        if entries.contains_key(&path) {
            return Err(IoError::new(ErrorKind::AlreadyExists, "file exists"));
        }
        entries.insert(
            path.clone(),
            MemNode::File {
                content: Vec::new(),
                mode: N_MODE_FILE_DEFAULT,
            },
        );
        Ok(Box::new(MemFileWriter {
            fs: self,
            path,
            buf: Vec::new(),
            if_dirty: false,
        }))
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let path = normalize_path(path);
        let mut entries = self.lock_write()?;

        let mut path_cursor = PathBuf::from("/");
        for component in path.components().skip(1) {
            path_cursor.push(component.as_os_str());
            match entries.get(&path_cursor) {
                Some(MemNode::Directory { .. }) => {}
                Some(_) => {
                    return Err(IoError::new(ErrorKind::NotADirectory, "not a directory"));
                }
                None => {
                    entries.insert(
                        path_cursor.clone(),
                        MemNode::Directory {
                            mode: mode & 0o7777,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        let path = normalize_path(path);
        let mut entries = self.lock_write()?;
        match entries.get_mut(&path) {
            Some(MemNode::File { mode: mode_node, .. })
            | Some(MemNode::Directory { mode: mode_node }) => {
                *mode_node = mode & 0o7777;
                Ok(())
            }
            Some(MemNode::Symlink { .. }) => Err(IoError::new(
                ErrorKind::Unsupported,
                "cannot change mode of a symlink",
            )),
            None => Err(IoError::new(ErrorKind::NotFound, "file not found")),
        }
    }
}

/// Write handle for a [`MemFs`] file. Bytes are buffered and committed on
/// flush, on `sync_all`, and on drop.
struct MemFileWriter<'a> {
    fs: &'a MemFs,
    path: PathBuf,
    buf: Vec<u8>,
    if_dirty: bool,
}

impl MemFileWriter<'_> {
    fn commit(&mut self) -> io::Result<()> {
        if !self.if_dirty {
            return Ok(());
        }
        let mut entries = self.fs.lock_write()?;
        match entries.get_mut(&self.path) {
            Some(MemNode::File { content, .. }) => {
                content.clone_from(&self.buf);
                self.if_dirty = false;
                Ok(())
            }
            _ => Err(IoError::new(ErrorKind::NotFound, "file was removed")),
        }
    }
}

impl Write for MemFileWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        self.if_dirty = true;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit()
    }
}

impl FileWrite for MemFileWriter<'_> {
    fn sync_all(&mut self) -> io::Result<()> {
        self.commit()
    }
}

impl Drop for MemFileWriter<'_> {
    fn drop(&mut self) {
        let _ = self.commit();
    }
}
