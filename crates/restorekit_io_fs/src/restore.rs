//! Restoration driver: the fixed, ordered sequence of copy steps.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::copy::{copy_file, copy_top_level_files, merge_tree, mirror_tree};
use crate::report::{ReportRestore, ReportRestoreBuilder};
use crate::spec::{EnumRestoreStep, EnumSyncStrategy, RestoreError, SpecRestorePlan};
use crate::util::{is_overlap, try_exists};

/// Receives step notifications while `restore` runs.
pub trait RestoreObserver {
    /// Called right before `step` starts.
    fn on_step(&mut self, step: EnumRestoreStep);
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RestoreObserver for NoopObserver {
    fn on_step(&mut self, _step: EnumRestoreStep) {}
}

impl<F: FnMut(EnumRestoreStep)> RestoreObserver for F {
    fn on_step(&mut self, step: EnumRestoreStep) {
        self(step)
    }
}

/// Restore `dir_destination` from the backup at `dir_source`.
///
/// Runs every [`EnumRestoreStep`] in order:
/// 1. top-level files matching the plan's glob patterns;
/// 2. mirror `src` (required);
/// 3. union-merge `data` and `scripts` when present;
/// 4. union-merge `.github` when present;
/// 5. the audio fixture when present;
/// 6. `package.json` (required), then `package-lock.json` when present.
///
/// The destination root is created if missing. The first error aborts the
/// run; steps already performed are not rolled back.
pub fn restore<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_plan: &SpecRestorePlan,
    observer: &mut dyn RestoreObserver,
) -> Result<ReportRestore, RestoreError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref().to_path_buf();
    let path_dir_dst = dir_destination.as_ref().to_path_buf();

    if !path_dir_src.is_dir() {
        return Err(RestoreError::SourceNotDirectory(path_dir_src));
    }
    if is_overlap(&path_dir_src, &path_dir_dst) {
        return Err(RestoreError::SourceDestinationOverlap {
            source_root: path_dir_src,
            destination_root: path_dir_dst,
        });
    }
    let mut builder_report = ReportRestoreBuilder::default();
    if !path_dir_dst.is_dir() {
        fs::create_dir_all(&path_dir_dst).map_err(|e| RestoreError::DestinationInitFailed {
            path: path_dir_dst.clone(),
            message: e.to_string(),
        })?;
        builder_report.add_dir_created();
    }

    info!(
        src = %path_dir_src.display(),
        dst = %path_dir_dst.display(),
        "restore started"
    );

    for step in EnumRestoreStep::ALL {
        observer.on_step(step);
        info!(step = ?step, "{}", step.label());
        run_step(
            step,
            &path_dir_src,
            &path_dir_dst,
            spec_plan,
            &mut builder_report,
        )?;
    }

    let report = builder_report.build();
    info!("{report}");
    Ok(report)
}

fn run_step(
    step: EnumRestoreStep,
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_plan: &SpecRestorePlan,
    builder_report: &mut ReportRestoreBuilder,
) -> Result<(), RestoreError> {
    match step {
        EnumRestoreStep::TopLevelFiles => copy_top_level_files(
            path_dir_src,
            path_dir_dst,
            &spec_plan.patterns_top_level_files,
            builder_report,
        ),
        EnumRestoreStep::MirrorSrc
        | EnumRestoreStep::MergeDataScripts
        | EnumRestoreStep::MergeGithub => {
            for spec_subtree in spec_plan.subtrees_for(step) {
                let path_sub_src = path_dir_src.join(&spec_subtree.name);
                let path_sub_dst = path_dir_dst.join(&spec_subtree.name);
                if !spec_subtree.if_required && !try_exists(&path_sub_src)? {
                    skip_optional(path_sub_src, builder_report);
                    continue;
                }
                match spec_subtree.rule_sync {
                    EnumSyncStrategy::Mirror => {
                        mirror_tree(&path_sub_src, &path_sub_dst, builder_report)?
                    }
                    EnumSyncStrategy::UnionMerge => {
                        if !merge_tree(&path_sub_src, &path_sub_dst, builder_report)? {
                            return Err(RestoreError::RequiredSourceMissing {
                                path: path_sub_src,
                            });
                        }
                    }
                }
            }
            Ok(())
        }
        EnumRestoreStep::AudioFixture => copy_root_file(
            path_dir_src,
            path_dir_dst,
            &spec_plan.name_file_audio,
            false,
            builder_report,
        ),
        EnumRestoreStep::PackageManifests => {
            copy_root_file(
                path_dir_src,
                path_dir_dst,
                &spec_plan.name_file_manifest,
                true,
                builder_report,
            )?;
            copy_root_file(
                path_dir_src,
                path_dir_dst,
                &spec_plan.name_file_lock,
                false,
                builder_report,
            )
        }
    }
}

fn copy_root_file(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    name_file: &str,
    if_required: bool,
    builder_report: &mut ReportRestoreBuilder,
) -> Result<(), RestoreError> {
    let path_file_src = path_dir_src.join(name_file);
    if !try_exists(&path_file_src)? {
        if if_required {
            return Err(RestoreError::RequiredSourceMissing {
                path: path_file_src,
            });
        }
        skip_optional(path_file_src, builder_report);
        return Ok(());
    }
    copy_file(&path_file_src, &path_dir_dst.join(name_file), builder_report)
}

fn skip_optional(path_src: PathBuf, builder_report: &mut ReportRestoreBuilder) {
    debug!(path = %path_src.display(), "optional source absent, skipped");
    builder_report.add_skipped(path_src);
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::Path;

    use filetime::{FileTime, set_file_mtime};

    use super::{NoopObserver, restore};
    use crate::report::ReportRestore;
    use crate::spec::{EnumRestoreStep, RestoreError, SpecRestorePlan};

    fn run_default(src: &Path, dst: &Path) -> Result<ReportRestore, RestoreError> {
        restore(src, dst, &SpecRestorePlan::default(), &mut NoopObserver)
    }

    fn write_text(path: &Path, txt: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, txt).expect("write text");
    }

    fn read_text(path: &Path) -> String {
        std::fs::read_to_string(path).expect("read text")
    }

    /// Relative path -> (content, mtime seconds) for every file under `root`.
    fn snapshot(root: &Path) -> BTreeMap<String, (Vec<u8>, i64)> {
        fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, (Vec<u8>, i64)>) {
            for entry in std::fs::read_dir(dir).expect("read dir") {
                let path = entry.expect("entry").path();
                if path.is_dir() {
                    walk(root, &path, out);
                    continue;
                }
                let meta = std::fs::metadata(&path).expect("metadata");
                let rel = path
                    .strip_prefix(root)
                    .expect("strip")
                    .to_string_lossy()
                    .to_string();
                out.insert(
                    rel,
                    (
                        std::fs::read(&path).expect("read"),
                        FileTime::from_last_modification_time(&meta).unix_seconds(),
                    ),
                );
            }
        }
        let mut out = BTreeMap::new();
        walk(root, root, &mut out);
        out
    }

    fn minimal_backup(src: &Path) {
        write_text(&src.join("package.json"), "{\"name\": \"server\"}");
        write_text(&src.join("src/index.js"), "module.exports = {};");
    }

    #[test]
    fn restore_readme_src_and_data_scenario() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("server-BROKEN");
        let dst = tmp.path().join("server");

        minimal_backup(&src);
        write_text(&src.join("README.md"), "# Server");
        write_text(&src.join("data/cache.json"), "{}");
        write_text(&dst.join("src/old.js"), "stale");

        let report = run_default(&src, &dst).expect("restore");

        assert_eq!(read_text(&dst.join("README.md")), "# Server");
        assert_eq!(read_text(&dst.join("src/index.js")), "module.exports = {};");
        assert!(!dst.join("src/old.js").exists());
        assert_eq!(read_text(&dst.join("data/cache.json")), "{}");
        assert_eq!(report.cnt_dirs_removed, 1);
    }

    #[test]
    fn restore_union_merges_data_and_scripts() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src_root");
        let dst = tmp.path().join("dst_root");

        minimal_backup(&src);
        write_text(&src.join("data/shared.json"), "backup");
        write_text(&src.join("scripts/build.sh"), "backup");
        write_text(&dst.join("data/shared.json"), "current");
        write_text(&dst.join("data/local-only.json"), "current");
        write_text(&dst.join("scripts/local-only.sh"), "current");

        run_default(&src, &dst).expect("restore");

        assert_eq!(read_text(&dst.join("data/shared.json")), "backup");
        assert_eq!(read_text(&dst.join("data/local-only.json")), "current");
        assert_eq!(read_text(&dst.join("scripts/build.sh")), "backup");
        assert_eq!(read_text(&dst.join("scripts/local-only.sh")), "current");
    }

    #[test]
    fn restore_absent_optional_subtrees_leave_destination_unchanged() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src_root");
        let dst = tmp.path().join("dst_root");

        minimal_backup(&src);
        write_text(&dst.join("data/keep.json"), "keep");
        write_text(&dst.join(".github/workflows/ci.yml"), "on: push");
        let snapshot_data_before = snapshot(&dst.join("data"));
        let snapshot_github_before = snapshot(&dst.join(".github"));

        let report = run_default(&src, &dst).expect("restore");

        assert_eq!(snapshot(&dst.join("data")), snapshot_data_before);
        assert_eq!(snapshot(&dst.join(".github")), snapshot_github_before);
        assert!(!dst.join("scripts").exists());
        assert!(!dst.join("test-verbatim.mp3").exists());
        assert!(!dst.join("package-lock.json").exists());

        let l_skipped: Vec<_> = report
            .skipped
            .iter()
            .map(|p| p.file_name().expect("name").to_string_lossy().to_string())
            .collect();
        assert_eq!(
            l_skipped,
            vec![
                "data",
                "scripts",
                ".github",
                "test-verbatim.mp3",
                "package-lock.json"
            ]
        );
    }

    #[test]
    fn restore_copies_optional_entries_when_present() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src_root");
        let dst = tmp.path().join("dst_root");

        minimal_backup(&src);
        write_text(&src.join(".github/workflows/ci.yml"), "backup");
        write_text(&src.join("test-verbatim.mp3"), "ID3");
        write_text(&src.join("package-lock.json"), "{\"lockfileVersion\": 3}");
        write_text(&dst.join(".github/CODEOWNERS"), "* @owner");

        let report = run_default(&src, &dst).expect("restore");

        assert_eq!(read_text(&dst.join(".github/workflows/ci.yml")), "backup");
        assert_eq!(read_text(&dst.join(".github/CODEOWNERS")), "* @owner");
        assert_eq!(read_text(&dst.join("test-verbatim.mp3")), "ID3");
        assert_eq!(
            read_text(&dst.join("package-lock.json")),
            "{\"lockfileVersion\": 3}"
        );
        assert!(report.skipped.iter().all(|p| !p.ends_with(".github")));
    }

    #[test]
    fn restore_top_level_globs_only() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src_root");
        let dst = tmp.path().join("dst_root");

        minimal_backup(&src);
        write_text(&src.join("server.js"), "js");
        write_text(&src.join("tsconfig.json"), "{}");
        write_text(&src.join("setup.sh"), "#!/bin/sh");
        write_text(&src.join("CHANGELOG.md"), "log");
        write_text(&src.join("notes.txt"), "txt");
        write_text(&src.join("bin/cli.js"), "nested");

        run_default(&src, &dst).expect("restore");

        for name in ["server.js", "tsconfig.json", "setup.sh", "CHANGELOG.md"] {
            assert!(dst.join(name).is_file(), "{name} missing");
        }
        assert!(!dst.join("notes.txt").exists());
        assert!(!dst.join("bin").exists());
    }

    #[test]
    fn restore_missing_manifest_fails_after_earlier_steps() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src_root");
        let dst = tmp.path().join("dst_root");

        write_text(&src.join("src/index.js"), "js");
        write_text(&src.join("README.md"), "readme");
        write_text(&src.join("data/cache.json"), "{}");

        let mut l_steps = Vec::new();
        let mut observer = |step: EnumRestoreStep| l_steps.push(step);
        let err = restore(&src, &dst, &SpecRestorePlan::default(), &mut observer)
            .expect_err("missing package.json must fail");

        assert!(matches!(
            &err,
            RestoreError::RequiredSourceMissing { path } if path.ends_with("package.json")
        ));
        assert_eq!(l_steps, EnumRestoreStep::ALL.to_vec());
        // no rollback: earlier steps stay applied
        assert!(dst.join("README.md").exists());
        assert!(dst.join("src/index.js").exists());
        assert!(dst.join("data/cache.json").exists());
    }

    #[test]
    fn restore_missing_src_is_fatal_and_keeps_destination_src() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src_root");
        let dst = tmp.path().join("dst_root");

        write_text(&src.join("package.json"), "{}");
        write_text(&dst.join("src/index.js"), "current");

        let err = run_default(&src, &dst)
            .expect_err("missing src must fail");

        assert!(matches!(
            err,
            RestoreError::RequiredSourceMissing { path } if path.ends_with("src")
        ));
        assert_eq!(read_text(&dst.join("src/index.js")), "current");
    }

    #[test]
    fn restore_is_idempotent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src_root");
        let dst = tmp.path().join("dst_root");

        minimal_backup(&src);
        write_text(&src.join("README.md"), "readme");
        write_text(&src.join("src/lib/util.js"), "util");
        write_text(&src.join("data/cache.json"), "{}");
        write_text(&src.join("scripts/run.sh"), "run");
        write_text(&dst.join("data/local.json"), "local");
        set_file_mtime(
            src.join("README.md"),
            FileTime::from_unix_time(1_700_000_000, 0),
        )
        .expect("set mtime");

        run_default(&src, &dst).expect("first run");
        let snapshot_once = snapshot(&dst);
        run_default(&src, &dst).expect("second run");

        assert_eq!(snapshot(&dst), snapshot_once);
        assert_eq!(snapshot_once["README.md"].1, 1_700_000_000);
    }

    #[test]
    fn restore_creates_missing_destination_root() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src_root");
        let dst = tmp.path().join("fresh/dst_root");
        minimal_backup(&src);

        let report = run_default(&src, &dst).expect("restore");

        assert!(dst.join("package.json").is_file());
        assert!(report.cnt_dirs_created >= 1);
    }

    #[test]
    fn restore_rejects_missing_source_root() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("missing");
        let dst = tmp.path().join("dst_root");

        let err = run_default(&src, &dst).expect_err("must fail");
        assert!(matches!(err, RestoreError::SourceNotDirectory(_)));
        assert!(!dst.exists());
    }

    #[test]
    fn restore_rejects_overlapping_roots() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src_root");
        minimal_backup(&src);

        let err = restore(
            &src,
            src.join("nested"),
            &SpecRestorePlan::default(),
            &mut NoopObserver,
        )
        .expect_err("must fail");
        assert!(matches!(err, RestoreError::SourceDestinationOverlap { .. }));
    }

    #[test]
    fn restore_notifies_observer_in_order() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src_root");
        let dst = tmp.path().join("dst_root");
        minimal_backup(&src);

        let mut l_steps = Vec::new();
        let mut observer = |step: EnumRestoreStep| l_steps.push(step);
        restore(&src, &dst, &SpecRestorePlan::default(), &mut observer).expect("restore");

        assert_eq!(l_steps, EnumRestoreStep::ALL.to_vec());
    }

    #[cfg(unix)]
    #[test]
    fn restore_ignores_dangling_link_outside_the_patterns() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src_root");
        let dst = tmp.path().join("dst_root");
        minimal_backup(&src);
        symlink(tmp.path().join("gone"), src.join(".#notes.txt")).expect("symlink");

        run_default(&src, &dst).expect("restore");

        assert!(dst.join("package.json").is_file());
        assert!(!dst.join(".#notes.txt").exists());
    }
}

