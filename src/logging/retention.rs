//! Rotated file retention management
//!
//! Handles cleanup of rotated log files based on age.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};

use crate::fs::FileSystem;

use super::rotation::LOCK_SUFFIX;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Outcome of one retention sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Rotated files deleted
    pub deleted: usize,
    /// Rotated files that were expired but could not be deleted
    pub failed: usize,
}

/// Check if `path` is a rotated sibling of `active` (`<active>.*`, minus the lock marker)
///
/// Only file names are compared; callers list the active file's own directory.
pub fn is_rotated_file(active: &Path, path: &Path) -> bool {
    let (Some(active_name), Some(name)) = (
        active.file_name().and_then(|n| n.to_str()),
        path.file_name().and_then(|n| n.to_str()),
    ) else {
        return false;
    };
    match name.strip_prefix(active_name) {
        Some(LOCK_SUFFIX) => false,
        Some(rest) => rest.len() > 1 && rest.starts_with('.'),
        None => false,
    }
}

/// List every rotated file belonging to `active`
pub fn rotated_files(fs: &dyn FileSystem, active: &Path) -> Vec<PathBuf> {
    let dir = match active.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut files: Vec<_> = match fs.list_files(dir) {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Cannot list log directory");
            return Vec::new();
        }
    };
    files.retain(|path| is_rotated_file(active, path));
    files.sort();
    files
}

/// Delete rotated files of `active` older than `keep_days`
///
/// A retention of 0 keeps everything, as does one too long to represent. Failures are
/// reported and the sweep moves on to the remaining files.
pub fn sweep(
    fs: &dyn FileSystem,
    active: &Path,
    keep_days: u64,
    now: DateTime<Local>,
) -> SweepReport {
    let mut report = SweepReport::default();
    if keep_days == 0 {
        return report;
    }

    let Some(secs) = keep_days.checked_mul(SECS_PER_DAY) else {
        return report;
    };
    let retention = Duration::from_secs(secs);
    let cutoff = SystemTime::from(now)
        .checked_sub(retention)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    for path in rotated_files(fs, active) {
        let modified = match fs.modified(&path) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Skipping file without mtime");
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }
        match fs.remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Deleted expired rotated log");
                report.deleted += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete expired rotated log");
                report.failed += 1;
            }
        }
    }

    report
}
