use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::backend::{DirEntry, Metadata};
use crate::spec::{EnumPatternMode, Result, TreeFsError};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypePatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypePatternSeq {
    fn is_match(&self, value: &str) -> bool {
        match self {
            TypePatternSeq::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            TypePatternSeq::Glob(v) => v.iter().any(|p| p.is_match(value)),
            TypePatternSeq::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

pub(crate) fn compile_patterns(
    patterns: Option<&[String]>,
    rule_pattern: EnumPatternMode,
) -> Result<Option<TypePatternSeq>> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }

    match rule_pattern {
        EnumPatternMode::Literal => Ok(Some(TypePatternSeq::Literal(patterns.to_vec()))),
        EnumPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let matcher = Glob::new(pattern)
                    .map_err(|e| TreeFsError::InvalidPattern(e.to_string()))?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(Some(TypePatternSeq::Glob(l_glob)))
        }
        EnumPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let regex =
                    Regex::new(pattern).map_err(|e| TreeFsError::InvalidPattern(e.to_string()))?;
                l_regex.push(regex);
            }
            Ok(Some(TypePatternSeq::Regex(l_regex)))
        }
    }
}

pub(crate) fn should_exclude_by_patterns(
    value: &str,
    patterns_exclude: Option<&TypePatternSeq>,
) -> bool {
    patterns_exclude.is_some_and(|p| p.is_match(value))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region EntryHelpers

/// Wrap an IO error with the path it happened on.
pub(crate) fn wrap_io(path: &Path) -> impl FnOnce(io::Error) -> TreeFsError + use<> {
    let path: PathBuf = path.to_path_buf();
    move |source| TreeFsError::Io { path, source }
}

/// Reject entry kinds neither engine can walk into or read.
pub(crate) fn ensure_supported_entry(path: &Path, meta: &Metadata) -> Result<()> {
    if meta.file_type.is_symlink() {
        return Err(TreeFsError::SymlinkUnsupported(path.to_path_buf()));
    }
    if meta.file_type.is_other() {
        return Err(TreeFsError::SpecialFileUnsupported(path.to_path_buf()));
    }
    Ok(())
}

/// Reject anything that is not a regular file.
pub(crate) fn ensure_regular_file(path: &Path, meta: &Metadata) -> Result<()> {
    ensure_supported_entry(path, meta)?;
    if !meta.file_type.is_file() {
        return Err(TreeFsError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

/// Render entry names the way diff details list them: `[a b c]`.
pub(crate) fn format_entry_names(l_entries: &[DirEntry]) -> String {
    let l_names: Vec<String> = l_entries
        .iter()
        .map(|e| e.name.to_string_lossy().into_owned())
        .collect();
    format!("[{}]", l_names.join(" "))
}

/// Render permission bits with a leading zero, e.g. `0644`.
pub(crate) fn format_mode(mode: u32) -> String {
    format!("0{mode:o}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
