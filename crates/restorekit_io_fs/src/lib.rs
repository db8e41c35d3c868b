//! `restorekit_io_fs`:
//! Rust-side engine that restores a working copy from a backup directory.
//!
//! Modules:
//! - `copy`    : file, glob, union-merge and mirror copy primitives
//! - `restore` : the ordered restoration driver
//! - `spec`    : enums/plan/errors
//! - `report`  : run-time report model
//! - `util`    : shared helper functions

pub mod copy;
pub mod report;
pub mod restore;
pub mod spec;
mod util;

pub use copy::{copy_file, copy_top_level_files, merge_tree, mirror_tree};
pub use report::{ReportRestore, ReportRestoreBuilder};
pub use restore::{NoopObserver, RestoreObserver, restore};
pub use spec::{EnumRestoreStep, EnumSyncStrategy, RestoreError, SpecRestorePlan, SpecSubtree};
