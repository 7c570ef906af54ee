//! Rotation executor
//!
//! Copies the active file to its rotated name and truncates it in place, so writers
//! holding the file open keep appending to the same inode. A lock marker created with
//! exclusive-create keeps two writers (possibly in different processes) from rotating
//! at the same time.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};

use crate::clock::Clock;
use crate::config::SinkConfig;
use crate::error::{Result, SinkError};
use crate::fs::FileSystem;

use super::buffer::WriteBuffer;
use super::policy::{is_rotation_due, rotated_path, RotationKind};
use super::retention;

/// Suffix of the lock marker next to the active file
pub const LOCK_SUFFIX: &str = ".lock";

/// Lock markers older than this were left behind by a killed process
pub const STALE_LOCK_AGE: Duration = Duration::from_secs(5 * 60);

/// `<active>.lock`
pub fn lock_path(active: &Path) -> PathBuf {
    let mut name = active.as_os_str().to_os_string();
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

/// Result of a rotation attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The active file was copied to `path` and truncated
    Rotated { path: PathBuf, bytes: u64 },
    /// There is no active file
    NothingToRotate,
    /// The target name exists already; it is never overwritten
    AlreadyRotated { path: PathBuf },
    /// Another writer rotated between the due-check and the lock
    NoLongerDue,
}

impl RotationOutcome {
    pub fn rotated_path(&self) -> Option<&Path> {
        match self {
            RotationOutcome::Rotated { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Exclusive rotation lock, released when dropped
pub struct RotationLock<'a> {
    fs: &'a dyn FileSystem,
    path: PathBuf,
}

impl std::fmt::Debug for RotationLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationLock").field("path", &self.path).finish_non_exhaustive()
    }
}

impl<'a> RotationLock<'a> {
    /// Try once to take the lock for `active`
    ///
    /// Never waits. A busy lock yields `SinkError::LockUnavailable`. A marker older than
    /// `STALE_LOCK_AGE` is removed and the lock still reported busy; only a later plain
    /// exclusive create ever takes it.
    pub fn acquire(fs: &'a dyn FileSystem, active: &Path, now: DateTime<Local>) -> Result<Self> {
        let path = lock_path(active);
        let contents = format!("{} {}\n", std::process::id(), now.to_rfc3339());

        match fs.create_exclusive(&path, contents.as_bytes()) {
            Ok(()) => return Ok(Self { fs, path }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(SinkError::io("create lock", path, e)),
        }

        if is_stale(fs, &path, now) {
            tracing::warn!(lock = %path.display(), "Removing stale rotation lock");
            if let Err(e) = fs.remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(lock = %path.display(), error = %e, "Failed to remove stale rotation lock");
                }
            }
        }

        Err(SinkError::LockUnavailable { lock: path })
    }
}

impl Drop for RotationLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.fs.remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(lock = %self.path.display(), error = %e, "Failed to release rotation lock");
            }
        }
    }
}

fn is_stale(fs: &dyn FileSystem, lock: &Path, now: DateTime<Local>) -> bool {
    let Ok(modified) = fs.modified(lock) else {
        return false;
    };
    SystemTime::from(now)
        .duration_since(modified)
        .map(|age| age > STALE_LOCK_AGE)
        .unwrap_or(false)
}

/// Performs rotations of one sink's active file
pub struct RotationExecutor<'a> {
    config: &'a SinkConfig,
    fs: &'a dyn FileSystem,
    clock: &'a dyn Clock,
}

impl<'a> RotationExecutor<'a> {
    pub fn new(config: &'a SinkConfig, fs: &'a dyn FileSystem, clock: &'a dyn Clock) -> Self {
        Self { config, fs, clock }
    }

    /// Rotate the active file
    ///
    /// Pending records in `buffer` are flushed into the active file first, so the
    /// rotated copy holds everything emitted before the rotation. A successful rotation
    /// is followed by a retention sweep.
    pub fn rotate(&self, kind: RotationKind, buffer: &mut WriteBuffer) -> Result<RotationOutcome> {
        let Some(active) = self.config.file.as_deref() else {
            return Ok(RotationOutcome::NothingToRotate);
        };
        if !self.fs.exists(active) {
            return Ok(RotationOutcome::NothingToRotate);
        }

        let now = self.clock.now();
        let target = rotated_path(active, &kind, now);

        let lock = RotationLock::acquire(self.fs, active, now)?;

        if self.fs.exists(&target) {
            tracing::debug!(rotated = %target.display(), "Rotated file already exists, skipping");
            return Ok(RotationOutcome::AlreadyRotated { path: target });
        }

        // Two due-checks can pass before either takes the lock; only the first rotates
        if let RotationKind::Policy(_) = kind {
            if is_rotation_due(self.config, self.fs, now).is_none() {
                return Ok(RotationOutcome::NoLongerDue);
            }
        }

        buffer.flush(self.fs, Some(active))?;

        let bytes = match self.fs.copy(active, &target) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    active = %active.display(),
                    rotated = %target.display(),
                    error = %e,
                    "Failed to copy log for rotation, active file left untouched"
                );
                let _ = self.fs.remove_file(&target);
                return Err(SinkError::io("copy", active, e));
            }
        };

        if let Err(e) = self.fs.truncate(active) {
            tracing::warn!(active = %active.display(), error = %e, "Failed to truncate log after rotation");
            return Err(SinkError::io("truncate", active, e));
        }

        drop(lock);

        tracing::info!(rotated = %target.display(), bytes, "Rotated log file");

        let report = retention::sweep(self.fs, active, self.config.keep_days, now);
        if report.deleted > 0 {
            tracing::info!(deleted = report.deleted, "Cleaned up old rotated logs");
        }

        Ok(RotationOutcome::Rotated {
            path: target,
            bytes,
        })
    }
}
