//! Rotation policy
//!
//! Decides whether the active file is due for rotation and what the rotated copy is
//! called. Time-based decisions are made purely from the filesystem ("does a rotated
//! file for this period exist yet?") so independent processes sharing one log file
//! reach the same answer without talking to each other.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::config::{RotationStrategy, SinkConfig};
use crate::fs::FileSystem;

/// Timestamp format for size and manual rotations, second precision
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Infix that marks operator-requested rotations
pub const MANUAL_INFIX: &str = "manual";

/// Why a policy-driven rotation is due
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationTrigger {
    /// A new calendar period began and has no rotated file yet
    Period { suffix: String },
    /// The active file grew past the configured size
    Size { size: u64 },
}

/// What requested a rotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationKind {
    Policy(RotationTrigger),
    Manual,
}

/// Suffix identifying the calendar period containing `now`
///
/// Returns None for strategies that are not time-based.
pub fn period_suffix(strategy: RotationStrategy, now: DateTime<Local>) -> Option<String> {
    let format = match strategy {
        RotationStrategy::Hourly => "%Y-%m-%d-%H",
        RotationStrategy::Daily => "%Y-%m-%d",
        // ISO week-numbering year, so the last days of December can belong to week 1
        RotationStrategy::Weekly => "%G-W%V",
        RotationStrategy::Monthly => "%Y-%m",
        RotationStrategy::Size | RotationStrategy::None => return None,
    };
    Some(now.format(format).to_string())
}

/// Second-precision timestamp used for size and manual rotations
pub fn timestamp_suffix(now: DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// `<active>.<suffix>`
pub fn suffixed(active: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(active.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Name of the rotated copy for a rotation of `kind` happening at `now`
pub fn rotated_path(active: &Path, kind: &RotationKind, now: DateTime<Local>) -> PathBuf {
    match kind {
        RotationKind::Policy(RotationTrigger::Period { suffix }) => suffixed(active, suffix),
        RotationKind::Policy(RotationTrigger::Size { .. }) => {
            suffixed(active, &timestamp_suffix(now))
        }
        RotationKind::Manual => suffixed(
            active,
            &format!("{}.{}", MANUAL_INFIX, timestamp_suffix(now)),
        ),
    }
}

/// Check whether the active file must be rotated before the next write
pub fn is_rotation_due(
    config: &SinkConfig,
    fs: &dyn FileSystem,
    now: DateTime<Local>,
) -> Option<RotationTrigger> {
    if !config.rotation_active() {
        return None;
    }
    let active = config.file.as_deref()?;
    if !fs.exists(active) {
        return None;
    }

    match config.strategy {
        RotationStrategy::Size => {
            let size = match fs.file_len(active) {
                Ok(size) => size,
                Err(e) => {
                    tracing::debug!(path = %active.display(), error = %e, "Cannot stat active log file");
                    return None;
                }
            };
            // Strictly greater: a file of exactly max_size stays put
            (size > config.max_size).then_some(RotationTrigger::Size { size })
        }
        strategy => {
            let suffix = period_suffix(strategy, now)?;
            if fs.exists(&suffixed(active, &suffix)) {
                None
            } else {
                Some(RotationTrigger::Period { suffix })
            }
        }
    }
}
