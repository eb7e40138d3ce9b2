//! `fstestkit_io_fs` v1:
//! Tree comparison and tree copy for filesystem test fixtures.
//!
//! Modules:
//! - `backend` : `FileSystem` trait, host (`OsFs`) and in-memory (`MemFs`) trees
//! - `diff`    : directory/file/stream comparison with first-divergence details
//! - `copy`    : create-only tree copy and in-memory snapshots
//! - `spec`    : options/enums/errors
//! - `report`  : diff verdict and copy report models
//! - `util`    : shared helper functions
//!
//! Symlinks are rejected by both engines.

pub mod backend;
pub mod copy;
pub mod diff;
pub mod report;
pub mod spec;
mod util;

pub use backend::{DirEntry, FileSystem, FileType, FileWrite, MemFs, Metadata, OsFs};
pub use copy::{copy_dir, copy_dir_with, copy_file, in_memory_copy};
pub use diff::{
    compare_dir, compare_file, compare_reader, diff_dir, diff_dir_with, diff_file, diff_file_with,
    diff_reader, diff_reader_with,
};
pub use report::{ReportCopy, ReportDiff};
pub use spec::{
    EnumPatternMode, N_SIZE_CHUNK_DEFAULT, Result, SpecCopyOptions, SpecDiffOptions, TreeFsError,
};
