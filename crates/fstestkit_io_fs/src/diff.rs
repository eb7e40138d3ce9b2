//! Tree, file and stream comparison.
//!
//! Every `diff_*` function returns a [`ReportDiff`] carrying the verdict and a
//! description of the first divergence; the matching `compare_*` function keeps
//! only the verdict. Operational failures (missing paths, read errors, symlinks)
//! are returned as [`TreeFsError`] and never reported as "not equal".

use std::cmp::Ordering;
use std::io::{self, Read};
use std::path::Path;

use tracing::{debug, trace};

use crate::backend::{DirEntry, FileSystem};
use crate::report::ReportDiff;
use crate::spec::{N_SIZE_CHUNK_DEFAULT, Result, SpecDiffOptions, TreeFsError};
use crate::util::{
    TypePatternSeq, compile_patterns, ensure_regular_file, ensure_supported_entry,
    format_entry_names, format_mode, should_exclude_by_patterns, wrap_io,
};

struct SpecDiffContext<'a> {
    fs_a: &'a dyn FileSystem,
    fs_b: &'a dyn FileSystem,
    spec_diff_pats: Option<TypePatternSeq>,
    size_chunk: usize,
    if_compare_mode: bool,
}

/// Side of a two-stream comparison that failed to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumStreamSide {
    First,
    Second,
}

impl<'a> SpecDiffContext<'a> {
    fn new(
        fs_a: &'a dyn FileSystem,
        fs_b: &'a dyn FileSystem,
        spec_diff_options: &SpecDiffOptions,
    ) -> Result<Self> {
        Ok(Self {
            fs_a,
            fs_b,
            spec_diff_pats: compile_patterns(
                spec_diff_options.patterns_exclude.as_deref(),
                spec_diff_options.rule_pattern,
            )?,
            size_chunk: spec_diff_options.size_chunk.max(1),
            if_compare_mode: spec_diff_options.if_compare_mode,
        })
    }

    fn list_entries(&self, fs: &dyn FileSystem, path_dir: &Path) -> Result<Vec<DirEntry>> {
        let mut l_entries = fs.read_dir(path_dir).map_err(wrap_io(path_dir))?;
        if self.spec_diff_pats.is_some() {
            let spec_diff_pats = self.spec_diff_pats.as_ref();
            l_entries.retain(|e| {
                !should_exclude_by_patterns(&e.name.to_string_lossy(), spec_diff_pats)
            });
        }
        Ok(l_entries)
    }

    fn walk_dirs(&self, path_dir_a: &Path, path_dir_b: &Path) -> Result<ReportDiff> {
        debug!(
            dir_a = %path_dir_a.display(),
            dir_b = %path_dir_b.display(),
            "comparing directories"
        );
        let l_entries_a = self.list_entries(self.fs_a, path_dir_a)?;
        let l_entries_b = self.list_entries(self.fs_b, path_dir_b)?;

        let if_names_equal = l_entries_a.len() == l_entries_b.len()
            && l_entries_a
                .iter()
                .zip(&l_entries_b)
                .all(|(a, b)| a.name == b.name);
        if !if_names_equal {
            return Ok(ReportDiff::differ(format!(
                "files differ in {} {} and {} {}",
                path_dir_a.display(),
                format_entry_names(&l_entries_a),
                path_dir_b.display(),
                format_entry_names(&l_entries_b)
            )));
        }

        for (entry_a, entry_b) in l_entries_a.iter().zip(&l_entries_b) {
            let path_entry_a = path_dir_a.join(&entry_a.name);
            let path_entry_b = path_dir_b.join(&entry_b.name);

            ensure_supported_entry(&path_entry_a, &entry_a.metadata)?;
            ensure_supported_entry(&path_entry_b, &entry_b.metadata)?;

            let kind_a = entry_a.metadata.file_type;
            let kind_b = entry_b.metadata.file_type;
            if kind_a.is_dir() && kind_b.is_dir() {
                let report = self.walk_dirs(&path_entry_a, &path_entry_b)?;
                if !report.if_equal {
                    return Ok(report);
                }
            } else if kind_a.is_file() && kind_b.is_file() {
                let report = self.diff_files(&path_entry_a, &path_entry_b)?;
                if !report.if_equal {
                    return Ok(ReportDiff::differ(format!(
                        "files {} and {} differ: {}",
                        path_entry_a.display(),
                        path_entry_b.display(),
                        report.detail
                    )));
                }
            } else {
                return Ok(ReportDiff::differ(format!(
                    "entry types differ between {} ({}) and {} ({})",
                    path_entry_a.display(),
                    kind_a.as_str(),
                    path_entry_b.display(),
                    kind_b.as_str()
                )));
            }
        }

        Ok(ReportDiff::equal())
    }

    fn diff_files(&self, path_file_a: &Path, path_file_b: &Path) -> Result<ReportDiff> {
        trace!(
            file_a = %path_file_a.display(),
            file_b = %path_file_b.display(),
            "comparing files"
        );
        let stat_a = self.fs_a.stat(path_file_a).map_err(wrap_io(path_file_a))?;
        let stat_b = self.fs_b.stat(path_file_b).map_err(wrap_io(path_file_b))?;
        ensure_regular_file(path_file_a, &stat_a)?;
        ensure_regular_file(path_file_b, &stat_b)?;

        if stat_a.size != stat_b.size {
            return Ok(ReportDiff::differ(format!(
                "size differs between {} and {}",
                stat_a.size, stat_b.size
            )));
        }
        if self.if_compare_mode && stat_a.mode != stat_b.mode {
            return Ok(ReportDiff::differ(format!(
                "permissions differ between {} and {}",
                format_mode(stat_a.mode),
                format_mode(stat_b.mode)
            )));
        }

        let reader_a = self
            .fs_a
            .open_read(path_file_a)
            .map_err(wrap_io(path_file_a))?;
        let reader_b = self
            .fs_b
            .open_read(path_file_b)
            .map_err(wrap_io(path_file_b))?;

        diff_streams(reader_a, reader_b, self.size_chunk).map_err(|(side, source)| {
            let path = match side {
                EnumStreamSide::First => path_file_a,
                EnumStreamSide::Second => path_file_b,
            };
            TreeFsError::Io {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region Directories

/// Compare two directory trees; keep only the verdict.
pub fn compare_dir<P, Q>(
    fs_a: &dyn FileSystem,
    fs_b: &dyn FileSystem,
    dir_a: P,
    dir_b: Q,
) -> Result<bool>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    Ok(diff_dir(fs_a, fs_b, dir_a, dir_b)?.if_equal)
}

/// Compare two directory trees with default options.
pub fn diff_dir<P, Q>(
    fs_a: &dyn FileSystem,
    fs_b: &dyn FileSystem,
    dir_a: P,
    dir_b: Q,
) -> Result<ReportDiff>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    diff_dir_with(fs_a, fs_b, dir_a, dir_b, &SpecDiffOptions::default())
}

/// Compare two directory trees.
///
/// Both listings are compared by name first (after exclude patterns are
/// applied); then entries are walked pairwise in name order. Subdirectories
/// recurse, files go through [`diff_file_with`], and a file facing a directory
/// under the same name is a divergence. The first divergence ends the walk.
pub fn diff_dir_with<P, Q>(
    fs_a: &dyn FileSystem,
    fs_b: &dyn FileSystem,
    dir_a: P,
    dir_b: Q,
    spec_diff_options: &SpecDiffOptions,
) -> Result<ReportDiff>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let spec_diff_ctx = SpecDiffContext::new(fs_a, fs_b, spec_diff_options)?;
    let report = spec_diff_ctx.walk_dirs(dir_a.as_ref(), dir_b.as_ref())?;
    debug!(equal = report.if_equal, detail = %report.detail, "directory comparison finished");
    Ok(report)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Files

/// Compare two files; keep only the verdict.
pub fn compare_file<P, Q>(
    fs_a: &dyn FileSystem,
    fs_b: &dyn FileSystem,
    file_a: P,
    file_b: Q,
) -> Result<bool>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    Ok(diff_file(fs_a, fs_b, file_a, file_b)?.if_equal)
}

/// Compare two files with default options.
pub fn diff_file<P, Q>(
    fs_a: &dyn FileSystem,
    fs_b: &dyn FileSystem,
    file_a: P,
    file_b: Q,
) -> Result<ReportDiff>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    diff_file_with(fs_a, fs_b, file_a, file_b, &SpecDiffOptions::default())
}

/// Compare two regular files: size, then permission bits, then content.
///
/// Size and permission mismatches are reported without reading any content.
/// Exclude patterns in `spec_diff_options` do not apply here.
pub fn diff_file_with<P, Q>(
    fs_a: &dyn FileSystem,
    fs_b: &dyn FileSystem,
    file_a: P,
    file_b: Q,
    spec_diff_options: &SpecDiffOptions,
) -> Result<ReportDiff>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let spec_diff_ctx = SpecDiffContext {
        fs_a,
        fs_b,
        spec_diff_pats: None,
        size_chunk: spec_diff_options.size_chunk.max(1),
        if_compare_mode: spec_diff_options.if_compare_mode,
    };
    spec_diff_ctx.diff_files(file_a.as_ref(), file_b.as_ref())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Readers

/// Compare two byte streams; keep only the verdict.
pub fn compare_reader<A: Read, B: Read>(reader_a: A, reader_b: B) -> Result<bool> {
    Ok(diff_reader(reader_a, reader_b)?.if_equal)
}

/// Compare two byte streams in chunks of [`N_SIZE_CHUNK_DEFAULT`] bytes.
pub fn diff_reader<A: Read, B: Read>(reader_a: A, reader_b: B) -> Result<ReportDiff> {
    diff_streams(reader_a, reader_b, N_SIZE_CHUNK_DEFAULT).map_err(|(_, e)| TreeFsError::Read(e))
}

/// Compare two byte streams using the chunk size from `spec_diff_options`.
///
/// Streams are read forward once, from their current position. On a content
/// mismatch the detail quotes both chunks, as text when both are valid UTF-8
/// and as byte arrays otherwise; the first differing byte lies somewhere inside
/// the quoted chunks.
pub fn diff_reader_with<A: Read, B: Read>(
    reader_a: A,
    reader_b: B,
    spec_diff_options: &SpecDiffOptions,
) -> Result<ReportDiff> {
    diff_streams(reader_a, reader_b, spec_diff_options.size_chunk.max(1))
        .map_err(|(_, e)| TreeFsError::Read(e))
}

fn diff_streams<A: Read, B: Read>(
    mut reader_a: A,
    mut reader_b: B,
    size_chunk: usize,
) -> std::result::Result<ReportDiff, (EnumStreamSide, io::Error)> {
    let mut buf_a = vec![0u8; size_chunk];
    let mut buf_b = vec![0u8; size_chunk];

    loop {
        let n_a = fill_chunk(&mut reader_a, &mut buf_a).map_err(|e| (EnumStreamSide::First, e))?;
        let n_b = fill_chunk(&mut reader_b, &mut buf_b).map_err(|e| (EnumStreamSide::Second, e))?;
        let chunk_a = &buf_a[..n_a];
        let chunk_b = &buf_b[..n_b];

        let n_common = n_a.min(n_b);
        if chunk_a[..n_common] != chunk_b[..n_common] {
            return Ok(ReportDiff::differ(format_content_detail(chunk_a, chunk_b)));
        }

        match n_a.cmp(&n_b) {
            Ordering::Less => {
                return Ok(ReportDiff::differ(
                    "end of first reader reached before end of second reader",
                ));
            }
            Ordering::Greater => {
                return Ok(ReportDiff::differ(
                    "end of second reader reached before end of first reader",
                ));
            }
            // A short chunk on both sides means both streams are exhausted.
            Ordering::Equal if n_a < size_chunk => return Ok(ReportDiff::equal()),
            Ordering::Equal => {}
        }
    }
}

/// Read until `buf` is full or the stream ends. Returns the filled length.
fn fill_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut n_filled = 0;
    while n_filled < buf.len() {
        match reader.read(&mut buf[n_filled..]) {
            Ok(0) => break,
            Ok(n) => n_filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(n_filled)
}

fn format_content_detail(chunk_a: &[u8], chunk_b: &[u8]) -> String {
    match (std::str::from_utf8(chunk_a), std::str::from_utf8(chunk_b)) {
        (Ok(text_a), Ok(text_b)) => format!("content differs between {text_a} and {text_b}"),
        _ => format!("content differs between {chunk_a:?} and {chunk_b:?}"),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
