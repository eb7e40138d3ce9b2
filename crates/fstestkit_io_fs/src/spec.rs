//! Diff/copy option models and the crate error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Default chunk size used by reader comparison.
pub const N_SIZE_CHUNK_DEFAULT: usize = 128;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Pattern matching mode for entry-name exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Input options for [`crate::diff_dir_with`] and friends.
#[derive(Debug, Clone)]
pub struct SpecDiffOptions {
    /// Entry names (basename) hidden from both listings before comparing.
    pub patterns_exclude: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumPatternMode,
    /// Bytes read from each stream per comparison step. Values below 1 are
    /// treated as 1.
    pub size_chunk: usize,
    /// Compare permission bits of files.
    pub if_compare_mode: bool,
}

impl Default for SpecDiffOptions {
    fn default() -> Self {
        Self {
            patterns_exclude: None,
            rule_pattern: EnumPatternMode::Glob,
            size_chunk: N_SIZE_CHUNK_DEFAULT,
            if_compare_mode: true,
        }
    }
}

/// Input options for [`crate::copy_dir_with`].
#[derive(Debug, Clone)]
pub struct SpecCopyOptions {
    /// Entry names (basename) left out of the copy.
    pub patterns_exclude: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumPatternMode,
}

impl Default for SpecCopyOptions {
    fn default() -> Self {
        Self {
            patterns_exclude: None,
            rule_pattern: EnumPatternMode::Glob,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TreeFsError>;

/// Operational failures: the comparison or copy could not be carried out.
///
/// Two trees that merely differ are not an error; see [`crate::ReportDiff`].
#[derive(Debug, Error)]
pub enum TreeFsError {
    /// Stat/list/open/read/write failed on a path.
    #[error("{}: {source}", .path.display())]
    Io {
        /// Path the failing operation addressed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading a caller-supplied stream failed.
    #[error("failed to read stream: {0}")]
    Read(#[source] io::Error),
    /// Source path of a directory copy is not a directory.
    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    /// A file operation was pointed at something that is not a regular file.
    #[error("Not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    /// Copy destination is already present.
    #[error("Destination exists already: {}", .0.display())]
    DestinationExists(PathBuf),
    /// A symlink was found in a compared or copied tree.
    #[error("Symlinks are not supported: {}", .0.display())]
    SymlinkUnsupported(PathBuf),
    /// A FIFO, socket or device node was found in a compared or copied tree.
    #[error("Special files are not supported: {}", .0.display())]
    SpecialFileUnsupported(PathBuf),
    /// Invalid exclude pattern.
    #[error("Invalid pattern in exclude list: {0}")]
    InvalidPattern(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
