//! Filesystem tree traversal and copy orchestration.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::backend::{FileSystem, MemFs, OsFs};
use crate::report::{ReportCopy, ReportCopyBuilder};
use crate::spec::{Result, SpecCopyOptions, TreeFsError};
use crate::util::{
    TypePatternSeq, compile_patterns, ensure_regular_file, ensure_supported_entry,
    should_exclude_by_patterns, wrap_io,
};

#[derive(Debug, Clone)]
struct SpecCopyTaskDir {
    path_dir_dst: PathBuf,
    mode: u32,
}

#[derive(Debug, Clone)]
struct SpecCopyTaskFile {
    path_file_src: PathBuf,
    path_file_dst: PathBuf,
}

struct SpecCopyContext<'a> {
    fs_src: &'a dyn FileSystem,
    fs_dst: &'a dyn FileSystem,
    spec_cp_pats: Option<TypePatternSeq>,
    builder_cp_report: ReportCopyBuilder,
    l_tasks_dir: Vec<SpecCopyTaskDir>,
    l_tasks_file: Vec<SpecCopyTaskFile>,
}

/// Copy a directory tree with default options.
pub fn copy_dir<P, Q>(
    fs_src: &dyn FileSystem,
    fs_dst: &dyn FileSystem,
    dir_source: P,
    dir_destination: Q,
) -> Result<ReportCopy>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    copy_dir_with(
        fs_src,
        fs_dst,
        dir_source,
        dir_destination,
        &SpecCopyOptions::default(),
    )
}

/// Copy a directory tree from `dir_source` on `fs_src` to `dir_destination`
/// on `fs_dst`.
///
/// The copy only ever creates: it fails with
/// [`TreeFsError::DestinationExists`] when `dir_destination` is present.
///
/// This function performs:
/// 1. Source and destination checks.
/// 2. A full walk of the source tree that plans every directory and file, and
///    fails with [`TreeFsError::SymlinkUnsupported`] on the first symlink.
///    Nothing is written before this walk succeeds.
/// 3. Directory creation, file copies, then permission bits of every
///    directory, deepest first.
///
/// The first error aborts the run; entries already written stay in place.
pub fn copy_dir_with<P, Q>(
    fs_src: &dyn FileSystem,
    fs_dst: &dyn FileSystem,
    dir_source: P,
    dir_destination: Q,
    spec_cp_options: &SpecCopyOptions,
) -> Result<ReportCopy>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref();
    let path_dir_dst = dir_destination.as_ref();

    let spec_cp_pats = compile_patterns(
        spec_cp_options.patterns_exclude.as_deref(),
        spec_cp_options.rule_pattern,
    )?;

    let stat_dir_src = fs_src.stat(path_dir_src).map_err(wrap_io(path_dir_src))?;
    if stat_dir_src.file_type.is_symlink() {
        return Err(TreeFsError::SymlinkUnsupported(path_dir_src.to_path_buf()));
    }
    if !stat_dir_src.file_type.is_dir() {
        return Err(TreeFsError::SourceNotDirectory(path_dir_src.to_path_buf()));
    }
    if fs_dst.exists(path_dir_dst).map_err(wrap_io(path_dir_dst))? {
        return Err(TreeFsError::DestinationExists(path_dir_dst.to_path_buf()));
    }

    let mut spec_cp_ctx = SpecCopyContext {
        fs_src,
        fs_dst,
        spec_cp_pats,
        builder_cp_report: ReportCopyBuilder::default(),
        l_tasks_dir: vec![SpecCopyTaskDir {
            path_dir_dst: path_dir_dst.to_path_buf(),
            mode: stat_dir_src.mode,
        }],
        l_tasks_file: Vec::new(),
    };

    spec_cp_ctx.walk_directory(path_dir_src, path_dir_dst)?;
    debug!(
        src = %path_dir_src.display(),
        dst = %path_dir_dst.display(),
        dirs = spec_cp_ctx.l_tasks_dir.len(),
        files = spec_cp_ctx.l_tasks_file.len(),
        "copy planned"
    );
    spec_cp_ctx.flush_dir_tasks()?;
    spec_cp_ctx.flush_file_tasks()?;
    spec_cp_ctx.apply_dir_modes()?;

    let report = spec_cp_ctx.builder_cp_report.build();
    info!(src = %path_dir_src.display(), dst = %path_dir_dst.display(), "{report}");
    Ok(report)
}

impl SpecCopyContext<'_> {
    fn walk_directory(&mut self, path_dir_src: &Path, path_dir_dst: &Path) -> Result<()> {
        let l_entries = self
            .fs_src
            .read_dir(path_dir_src)
            .map_err(wrap_io(path_dir_src))?;

        for entry in l_entries {
            let name_match = entry.name.to_string_lossy();
            if should_exclude_by_patterns(&name_match, self.spec_cp_pats.as_ref()) {
                self.builder_cp_report.add_excluded();
                continue;
            }

            let path_entry_src = path_dir_src.join(&entry.name);
            let path_entry_dst = path_dir_dst.join(&entry.name);
            ensure_supported_entry(&path_entry_src, &entry.metadata)?;
            if entry.metadata.file_type.is_dir() {
                self.l_tasks_dir.push(SpecCopyTaskDir {
                    path_dir_dst: path_entry_dst.clone(),
                    mode: entry.metadata.mode,
                });
                self.walk_directory(&path_entry_src, &path_entry_dst)?;
                continue;
            }

            self.l_tasks_file.push(SpecCopyTaskFile {
                path_file_src: path_entry_src,
                path_file_dst: path_entry_dst,
            });
        }
        Ok(())
    }

    /// Directories are created owner-writable so they can be populated; the
    /// exact source bits are applied by `apply_dir_modes`.
    fn flush_dir_tasks(&mut self) -> Result<()> {
        for spec_task in &self.l_tasks_dir {
            self.fs_dst
                .mkdir_all(&spec_task.path_dir_dst, spec_task.mode | 0o700)
                .map_err(wrap_io(&spec_task.path_dir_dst))?;
            self.builder_cp_report.add_dir();
        }
        Ok(())
    }

    fn flush_file_tasks(&mut self) -> Result<()> {
        let l_tasks_file = std::mem::take(&mut self.l_tasks_file);
        for spec_task in l_tasks_file {
            let n_bytes = copy_file(
                self.fs_src,
                self.fs_dst,
                &spec_task.path_file_src,
                &spec_task.path_file_dst,
            )?;
            self.builder_cp_report.add_file(n_bytes);
        }
        Ok(())
    }

    /// Tasks are planned parent-first, so reverse order is deepest-first.
    fn apply_dir_modes(&mut self) -> Result<()> {
        for spec_task in self.l_tasks_dir.iter().rev() {
            self.fs_dst
                .set_mode(&spec_task.path_dir_dst, spec_task.mode)
                .map_err(wrap_io(&spec_task.path_dir_dst))?;
        }
        Ok(())
    }
}

/// Copy one regular file's bytes and permission bits. Returns bytes copied.
///
/// Fails with [`TreeFsError::DestinationExists`] when `file_destination` is
/// present, matching [`copy_dir`].
pub fn copy_file<P, Q>(
    fs_src: &dyn FileSystem,
    fs_dst: &dyn FileSystem,
    file_source: P,
    file_destination: Q,
) -> Result<u64>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_file_src = file_source.as_ref();
    let path_file_dst = file_destination.as_ref();

    let stat_file_src = fs_src.stat(path_file_src).map_err(wrap_io(path_file_src))?;
    ensure_regular_file(path_file_src, &stat_file_src)?;
    if fs_dst.exists(path_file_dst).map_err(wrap_io(path_file_dst))? {
        return Err(TreeFsError::DestinationExists(path_file_dst.to_path_buf()));
    }

    let mut reader = fs_src
        .open_read(path_file_src)
        .map_err(wrap_io(path_file_src))?;
    let mut writer = fs_dst
        .create_new(path_file_dst)
        .map_err(wrap_io(path_file_dst))?;
    fs_dst
        .set_mode(path_file_dst, stat_file_src.mode)
        .map_err(wrap_io(path_file_dst))?;

    let n_bytes = io::copy(&mut reader, &mut writer).map_err(wrap_io(path_file_src))?;
    writer.sync_all().map_err(wrap_io(path_file_dst))?;

    trace!(
        src = %path_file_src.display(),
        dst = %path_file_dst.display(),
        bytes = n_bytes,
        "file copied"
    );
    Ok(n_bytes)
}

/// Snapshot an on-disk tree into a fresh [`MemFs`] at `mem_path`.
///
/// `mem_path` must not be `/`, which always exists in a new [`MemFs`].
pub fn in_memory_copy<P, Q>(os_path: P, mem_path: Q) -> Result<MemFs>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let fs_mem = MemFs::new();
    copy_dir(&OsFs, &fs_mem, os_path, mem_path)?;
    Ok(fs_mem)
}
