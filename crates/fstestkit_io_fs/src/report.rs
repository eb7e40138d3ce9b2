//! Diff verdict and copy report models.

use std::fmt;

/// Outcome of one comparison: verdict plus a description of the first
/// divergence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDiff {
    /// Whether both sides matched.
    pub if_equal: bool,
    /// First divergence found; empty when `if_equal` is set.
    pub detail: String,
}

impl ReportDiff {
    /// Verdict for two matching sides.
    pub fn equal() -> Self {
        Self {
            if_equal: true,
            detail: String::new(),
        }
    }

    /// Verdict for two diverging sides.
    pub fn differ(detail: impl Into<String>) -> Self {
        Self {
            if_equal: false,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ReportDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.if_equal {
            write!(f, "[DIFF] equal")
        } else {
            write!(f, "[DIFF] differ: {}", self.detail)
        }
    }
}

/// Aggregate counters for one successful `copy_dir` run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportCopy {
    /// Directories created, the destination root included.
    pub cnt_dirs: u64,
    /// Regular files copied.
    pub cnt_files: u64,
    /// Bytes written across all files.
    pub cnt_bytes: u64,
    /// Source entries left out by exclude patterns.
    pub cnt_excluded: u64,
}

impl ReportCopy {
    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} dirs={} files={} bytes={} excluded={}",
            self.cnt_dirs, self.cnt_files, self.cnt_bytes, self.cnt_excluded
        )
    }
}

impl fmt::Display for ReportCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[COPY]"))
    }
}

/// Mutable accumulator for copy statistics.
#[derive(Debug, Default, Clone)]
pub(crate) struct ReportCopyBuilder {
    cnt_dirs: u64,
    cnt_files: u64,
    cnt_bytes: u64,
    cnt_excluded: u64,
}

impl ReportCopyBuilder {
    pub(crate) fn add_dir(&mut self) {
        self.cnt_dirs += 1;
    }

    /// Count one copied file of `n_bytes` bytes.
    pub(crate) fn add_file(&mut self, n_bytes: u64) {
        self.cnt_files += 1;
        self.cnt_bytes += n_bytes;
    }

    pub(crate) fn add_excluded(&mut self) {
        self.cnt_excluded += 1;
    }

    /// Finalize builder into immutable report.
    pub(crate) fn build(self) -> ReportCopy {
        ReportCopy {
            cnt_dirs: self.cnt_dirs,
            cnt_files: self.cnt_files,
            cnt_bytes: self.cnt_bytes,
            cnt_excluded: self.cnt_excluded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ReportCopy, ReportCopyBuilder, ReportDiff};

    #[test]
    fn report_copy_builder_and_format() {
        let mut builder = ReportCopyBuilder::default();
        builder.add_dir();
        builder.add_dir();
        builder.add_file(6);
        builder.add_file(3);
        builder.add_excluded();
        let report = builder.build();

        assert_eq!(
            report,
            ReportCopy {
                cnt_dirs: 2,
                cnt_files: 2,
                cnt_bytes: 9,
                cnt_excluded: 1,
            }
        );

        let txt = report.format("[COPY]");
        assert_eq!(txt, "[COPY] dirs=2 files=2 bytes=9 excluded=1");
        assert_eq!(report.to_string(), txt);
    }

    #[test]
    fn report_copy_default_is_empty() {
        assert_eq!(
            ReportCopy::default().to_string(),
            "[COPY] dirs=0 files=0 bytes=0 excluded=0"
        );
    }

    #[test]
    fn report_diff_display() {
        assert_eq!(ReportDiff::equal().to_string(), "[DIFF] equal");
        assert!(ReportDiff::equal().detail.is_empty());

        let report = ReportDiff::differ("size differs between 6 and 12");
        assert!(!report.if_equal);
        assert_eq!(
            report.to_string(),
            "[DIFF] differ: size differs between 6 and 12"
        );
    }
}
