//! Filesystem seam for the differ and the copier.
//!
//! - `FileSystem`: sync, object-safe trait over a path-addressed tree
//! - `OsFs`: the host filesystem
//! - `MemFs`: an in-memory tree, used for snapshots and test fixtures

mod memory;
mod os;
mod traits;

pub use memory::MemFs;
pub use os::OsFs;
pub use traits::{DirEntry, FileSystem, FileType, FileWrite, Metadata};
