//! Restoration report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Aggregate counters for one `restore` run.
#[derive(Debug, Default, Clone)]
pub struct ReportRestore {
    /// Files copied (including overwrites).
    pub cnt_files_copied: u64,
    /// Destination directories created.
    pub cnt_dirs_created: u64,
    /// Destination subtrees removed before mirroring.
    pub cnt_dirs_removed: u64,
    /// Optional source paths that were absent.
    pub skipped: Vec<PathBuf>,
}

impl ReportRestore {
    /// Number of skipped optional sources.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_files_copied".to_string(), self.cnt_files_copied);
        dict_counts.insert("cnt_dirs_created".to_string(), self.cnt_dirs_created);
        dict_counts.insert("cnt_dirs_removed".to_string(), self.cnt_dirs_removed);
        dict_counts.insert("cnt_skipped".to_string(), self.skipped_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} files={} dirs_created={} dirs_removed={} skipped={}",
            dict_counts["cnt_files_copied"],
            dict_counts["cnt_dirs_created"],
            dict_counts["cnt_dirs_removed"],
            dict_counts["cnt_skipped"],
        )
    }
}

impl fmt::Display for ReportRestore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[RESTORE]"))
    }
}

/// Mutable accumulator threaded through the copy helpers.
#[derive(Debug, Default, Clone)]
pub struct ReportRestoreBuilder {
    /// See [`ReportRestore::cnt_files_copied`].
    pub cnt_files_copied: u64,
    /// See [`ReportRestore::cnt_dirs_created`].
    pub cnt_dirs_created: u64,
    /// See [`ReportRestore::cnt_dirs_removed`].
    pub cnt_dirs_removed: u64,
    /// See [`ReportRestore::skipped`].
    pub skipped: Vec<PathBuf>,
}

impl ReportRestoreBuilder {
    pub fn add_file_copied(&mut self) {
        self.cnt_files_copied += 1;
    }

    pub fn add_dir_created(&mut self) {
        self.cnt_dirs_created += 1;
    }

    pub fn add_dir_removed(&mut self) {
        self.cnt_dirs_removed += 1;
    }

    /// Record an absent optional source.
    pub fn add_skipped(&mut self, path: PathBuf) {
        self.skipped.push(path);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportRestore {
        ReportRestore {
            cnt_files_copied: self.cnt_files_copied,
            cnt_dirs_created: self.cnt_dirs_created,
            cnt_dirs_removed: self.cnt_dirs_removed,
            skipped: self.skipped,
        }
    }
}
