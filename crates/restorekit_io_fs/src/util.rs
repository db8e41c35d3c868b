use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::spec::RestoreError;

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

/// Compiled top-level file patterns.
#[derive(Debug, Clone)]
pub(crate) struct SpecFilePatterns {
    glob_set: GlobSet,
}

impl SpecFilePatterns {
    pub(crate) fn from_raw(patterns: &[String]) -> Result<Self, RestoreError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| RestoreError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.kind().to_string(),
            })?;
            builder.add(glob);
        }
        let glob_set = builder.build().map_err(|e| RestoreError::InvalidPattern {
            pattern: patterns.join(","),
            message: e.to_string(),
        })?;
        Ok(Self { glob_set })
    }

    /// Shell-glob semantics: a leading `.` is never matched by a wildcard.
    pub(crate) fn is_match<N: AsRef<OsStr> + ?Sized>(&self, name_file: &N) -> bool {
        let name_file = name_file.as_ref();
        !is_hidden_name(name_file) && self.glob_set.is_match(Path::new(name_file))
    }
}

pub(crate) fn is_hidden_name(name: &OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// `true` when one path is the other or lies beneath it.
pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = _normalize_path(src);
    let dst_resolved = _normalize_path(dst);
    dst_resolved.starts_with(&src_resolved) || src_resolved.starts_with(&dst_resolved)
}

/// Existence check that follows symlinks and keeps real I/O errors.
pub(crate) fn try_exists(path: &Path) -> Result<bool, RestoreError> {
    path.try_exists().map_err(|e| RestoreError::io(path, e))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Metadata

/// Copy bytes, then permissions, access/modification times and (Linux) xattrs.
pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<(), io::Error> {
    fs::copy(path_file_src, path_file_dst)?;
    apply_metadata(path_file_src, path_file_dst)?;
    #[cfg(target_os = "linux")]
    {
        copy_xattrs_linux(path_file_src, path_file_dst);
    }
    Ok(())
}

/// Carry permissions and access/modification times of a directory over.
pub(crate) fn copy_dir_metadata(
    path_dir_src: &Path,
    path_dir_dst: &Path,
) -> Result<(), io::Error> {
    apply_metadata(path_dir_src, path_dir_dst)
}

fn apply_metadata(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    fs::set_permissions(path_file_dst, stat_src.permissions())?;
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(_) => return,
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        let _ = xattr::set(path_file_dst, &name, &raw_value);
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
