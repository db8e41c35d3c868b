//! Restoration plan models and top-level error types.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// How a source subtree lands in the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSyncStrategy {
    /// Delete the destination subtree, then recreate it from the source.
    Mirror,
    /// Recursively combine source into destination. Destination-only entries
    /// survive; same-named files are overwritten by the source version.
    UnionMerge,
}

/// Ordered steps of one restoration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnumRestoreStep {
    /// Top-level files matched by the plan's glob patterns.
    TopLevelFiles,
    /// Mirrored subtrees (`src`).
    MirrorSrc,
    /// Union-merged data subtrees (`data`, `scripts`).
    MergeDataScripts,
    /// Union-merged CI configuration (`.github`).
    MergeGithub,
    /// Optional audio test fixture.
    AudioFixture,
    /// Package manifest and lock file.
    PackageManifests,
}

impl EnumRestoreStep {
    /// All steps in execution order.
    pub const ALL: [EnumRestoreStep; 6] = [
        Self::TopLevelFiles,
        Self::MirrorSrc,
        Self::MergeDataScripts,
        Self::MergeGithub,
        Self::AudioFixture,
        Self::PackageManifests,
    ];

    /// Short human-readable progress label.
    pub fn label(self) -> &'static str {
        match self {
            Self::TopLevelFiles => "Copying documentation, script and configuration files",
            Self::MirrorSrc => "Replacing source tree",
            Self::MergeDataScripts => "Merging data and scripts directories",
            Self::MergeGithub => "Merging GitHub workflow directory",
            Self::AudioFixture => "Copying test audio file",
            Self::PackageManifests => "Copying package manifests",
        }
    }
}

impl fmt::Display for EnumRestoreStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// One subtree of the source root handled as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSubtree {
    /// Directory name relative to both roots.
    pub name: String,
    /// Mirror or union-merge.
    pub rule_sync: EnumSyncStrategy,
    /// Step that owns this subtree.
    pub step: EnumRestoreStep,
    /// Missing source is fatal when `true`, skipped otherwise.
    pub if_required: bool,
}

impl SpecSubtree {
    fn new(
        name: &str,
        rule_sync: EnumSyncStrategy,
        step: EnumRestoreStep,
        if_required: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            rule_sync,
            step,
            if_required,
        }
    }
}

/// Everything one restoration run copies.
#[derive(Debug, Clone)]
pub struct SpecRestorePlan {
    /// Glob patterns applied to top-level file names of the source root.
    pub patterns_top_level_files: Vec<String>,
    /// Subtrees, in execution order.
    pub subtrees: Vec<SpecSubtree>,
    /// Optional single file copied if present.
    pub name_file_audio: String,
    /// Required manifest; absence is fatal.
    pub name_file_manifest: String,
    /// Optional lock file copied after the manifest.
    pub name_file_lock: String,
}

impl Default for SpecRestorePlan {
    fn default() -> Self {
        Self {
            patterns_top_level_files: ["*.md", "*.js", "*.json", "*.sh"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            subtrees: vec![
                SpecSubtree::new(
                    "src",
                    EnumSyncStrategy::Mirror,
                    EnumRestoreStep::MirrorSrc,
                    true,
                ),
                SpecSubtree::new(
                    "data",
                    EnumSyncStrategy::UnionMerge,
                    EnumRestoreStep::MergeDataScripts,
                    false,
                ),
                SpecSubtree::new(
                    "scripts",
                    EnumSyncStrategy::UnionMerge,
                    EnumRestoreStep::MergeDataScripts,
                    false,
                ),
                SpecSubtree::new(
                    ".github",
                    EnumSyncStrategy::UnionMerge,
                    EnumRestoreStep::MergeGithub,
                    false,
                ),
            ],
            name_file_audio: "test-verbatim.mp3".to_string(),
            name_file_manifest: "package.json".to_string(),
            name_file_lock: "package-lock.json".to_string(),
        }
    }
}

impl SpecRestorePlan {
    /// Subtrees owned by `step`, in plan order.
    pub fn subtrees_for(&self, step: EnumRestoreStep) -> impl Iterator<Item = &SpecSubtree> {
        self.subtrees.iter().filter(move |s| s.step == step)
    }
}

/// Fatal restoration errors. The first one aborts the run; nothing is rolled back.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// Source root is missing or not a directory.
    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    /// Source and destination overlap (one contains the other).
    #[error(
        "Source and destination directories overlap: {} <-> {}",
        source_root.display(),
        destination_root.display()
    )]
    SourceDestinationOverlap {
        /// Normalized source root.
        source_root: PathBuf,
        /// Normalized destination root.
        destination_root: PathBuf,
    },

    /// Destination root could not be created or is unusable.
    #[error("Failed to initialize destination {}: {message}", path.display())]
    DestinationInitFailed {
        /// Destination root.
        path: PathBuf,
        /// Reason text.
        message: String,
    },

    /// Invalid top-level glob pattern.
    #[error("Invalid file pattern `{pattern}`: {message}")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Parser message.
        message: String,
    },

    /// A source entry the plan cannot do without is absent.
    #[error("Required source is missing: {}", path.display())]
    RequiredSourceMissing {
        /// Missing source path.
        path: PathBuf,
    },

    /// Source directory reached twice through symlinks.
    #[error("Symlink loop detected: {}", path.display())]
    SymlinkLoop {
        /// Directory entered a second time.
        path: PathBuf,
    },

    /// Raw I/O failure on `path`.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being read, written, created or removed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl RestoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
