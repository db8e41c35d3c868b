//! Filesystem copy primitives: single file, top-level glob, union-merge and mirror.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::report::ReportRestoreBuilder;
use crate::spec::RestoreError;
use crate::util::{SpecFilePatterns, copy_dir_metadata, copy_file_with_metadata, try_exists};

#[derive(Debug, Clone)]
struct SpecDirEntry {
    path_dir_src_sub: PathBuf,
    name_dir: OsString,
}

#[derive(Debug, Clone)]
struct SpecFileEntry {
    path_file_src: PathBuf,
    name_file: OsString,
}

#[derive(Debug)]
struct SpecWalkContext<'a> {
    builder_report: &'a mut ReportRestoreBuilder,
    set_visited_dirs: HashSet<(u64, u64)>,
}

/// Copy one file over `path_file_dst`, preserving times and permissions.
pub fn copy_file(
    path_file_src: &Path,
    path_file_dst: &Path,
    builder_report: &mut ReportRestoreBuilder,
) -> Result<(), RestoreError> {
    copy_file_with_metadata(path_file_src, path_file_dst)
        .map_err(|e| RestoreError::io(path_file_dst, e))?;
    debug!(
        src = %path_file_src.display(),
        dst = %path_file_dst.display(),
        "copied file"
    );
    builder_report.add_file_copied();
    Ok(())
}

/// Copy direct children of `path_dir_src` whose names match `patterns`.
///
/// Non-recursive. Directories and names starting with `.` are never matched.
/// Symlinks are followed; a matched link to a regular file copies the target bytes.
/// Entries whose names do not match are never inspected.
pub fn copy_top_level_files(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    patterns: &[String],
    builder_report: &mut ReportRestoreBuilder,
) -> Result<(), RestoreError> {
    let spec_pats = SpecFilePatterns::from_raw(patterns)?;

    let (_, l_files) = list_directory(path_dir_src, &|name: &OsStr| spec_pats.is_match(name))?;
    for spec_file_entry in l_files {
        copy_file(
            &spec_file_entry.path_file_src,
            &path_dir_dst.join(&spec_file_entry.name_file),
            builder_report,
        )?;
    }
    Ok(())
}

/// Union-merge `path_dir_src` into `path_dir_dst`.
///
/// Returns `Ok(false)` without touching anything when the source is absent.
/// Otherwise the destination is created if needed, files present on both
/// sides are overwritten with the source version, destination-only entries
/// survive, and subdirectories are merged recursively. Each merged directory
/// takes the source directory's permissions and times once its contents are in.
pub fn merge_tree(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    builder_report: &mut ReportRestoreBuilder,
) -> Result<bool, RestoreError> {
    if !try_exists(path_dir_src)? {
        return Ok(false);
    }

    let mut spec_walk_ctx = SpecWalkContext {
        builder_report,
        set_visited_dirs: HashSet::new(),
    };
    ensure_directory(path_dir_dst, &mut spec_walk_ctx)?;
    walk_directory(path_dir_src, path_dir_dst, &mut spec_walk_ctx)?;
    Ok(true)
}

/// Replace `path_dir_dst` with an exact copy of `path_dir_src`.
///
/// The source must exist. Its absence is reported before anything at the
/// destination is removed. Only a real directory is removed; a file or
/// symlink in its place is an error and is left alone.
pub fn mirror_tree(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    builder_report: &mut ReportRestoreBuilder,
) -> Result<(), RestoreError> {
    if !path_dir_src.is_dir() {
        return Err(RestoreError::RequiredSourceMissing {
            path: path_dir_src.to_path_buf(),
        });
    }

    match fs::symlink_metadata(path_dir_dst) {
        Ok(meta_dst) if meta_dst.file_type().is_dir() => {
            fs::remove_dir_all(path_dir_dst).map_err(|e| RestoreError::io(path_dir_dst, e))?;
            debug!(dst = %path_dir_dst.display(), "removed destination subtree");
            builder_report.add_dir_removed();
        }
        Ok(_) => {
            return Err(RestoreError::io(
                path_dir_dst,
                io::Error::new(
                    io::ErrorKind::NotADirectory,
                    "mirror destination exists and is not a directory",
                ),
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(RestoreError::io(path_dir_dst, e)),
    }

    merge_tree(path_dir_src, path_dir_dst, builder_report)?;
    Ok(())
}

fn ensure_directory(
    path_dir: &Path,
    spec_walk_ctx: &mut SpecWalkContext<'_>,
) -> Result<(), RestoreError> {
    if path_dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path_dir).map_err(|e| RestoreError::io(path_dir, e))?;
    spec_walk_ctx.builder_report.add_dir_created();
    Ok(())
}

fn _include_all(_name: &OsStr) -> bool {
    true
}

/// Split one directory level into subdirectories and files, both sorted by name.
///
/// `should_include` sees the raw name before anything is stat-ed, so rejected
/// entries (dangling links included) never cause an error.
fn list_directory(
    path_root: &Path,
    should_include: &dyn Fn(&OsStr) -> bool,
) -> Result<(Vec<SpecDirEntry>, Vec<SpecFileEntry>), RestoreError> {
    let mut l_dirs: Vec<SpecDirEntry> = Vec::new();
    let mut l_files: Vec<SpecFileEntry> = Vec::new();

    let iter_entries = fs::read_dir(path_root).map_err(|e| RestoreError::io(path_root, e))?;
    for entry_res in iter_entries {
        let entry = entry_res.map_err(|e| RestoreError::io(path_root, e))?;
        let name_entry = entry.file_name();
        if !should_include(&name_entry) {
            continue;
        }
        let path_entry = entry.path();

        // Follows symlinks; a dangling link surfaces here as NotFound.
        let meta_entry =
            fs::metadata(&path_entry).map_err(|e| RestoreError::io(&path_entry, e))?;
        if meta_entry.is_dir() {
            l_dirs.push(SpecDirEntry {
                path_dir_src_sub: path_entry,
                name_dir: name_entry,
            });
        } else if meta_entry.is_file() {
            l_files.push(SpecFileEntry {
                path_file_src: path_entry,
                name_file: name_entry,
            });
        } else {
            warn!(path = %path_entry.display(), "special file skipped");
        }
    }

    l_dirs.sort_by(|a, b| a.name_dir.cmp(&b.name_dir));
    l_files.sort_by(|a, b| a.name_file.cmp(&b.name_file));
    Ok((l_dirs, l_files))
}

fn walk_directory(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_walk_ctx: &mut SpecWalkContext<'_>,
) -> Result<(), RestoreError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        let stat_root =
            fs::metadata(path_dir_src).map_err(|e| RestoreError::io(path_dir_src, e))?;
        if !spec_walk_ctx
            .set_visited_dirs
            .insert((stat_root.dev(), stat_root.ino()))
        {
            return Err(RestoreError::SymlinkLoop {
                path: path_dir_src.to_path_buf(),
            });
        }
    }

    let (l_dirs, l_files) = list_directory(path_dir_src, &_include_all)?;

    for spec_dir_entry in l_dirs {
        let path_dir_dst_sub = path_dir_dst.join(&spec_dir_entry.name_dir);
        ensure_directory(&path_dir_dst_sub, spec_walk_ctx)?;
        walk_directory(
            &spec_dir_entry.path_dir_src_sub,
            &path_dir_dst_sub,
            spec_walk_ctx,
        )?;
    }

    for spec_file_entry in l_files {
        copy_file(
            &spec_file_entry.path_file_src,
            &path_dir_dst.join(&spec_file_entry.name_file),
            spec_walk_ctx.builder_report,
        )?;
    }

    // After the contents: writing children would bump the mtime again.
    copy_dir_metadata(path_dir_src, path_dir_dst)
        .map_err(|e| RestoreError::io(path_dir_dst, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        // Only the current ancestor chain counts; the same directory linked
        // from two sibling places is copied twice, not rejected.
        if let Ok(stat_root) = fs::metadata(path_dir_src) {
            spec_walk_ctx
                .set_visited_dirs
                .remove(&(stat_root.dev(), stat_root.ino()));
        }
    }
    Ok(())
}
