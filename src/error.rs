//! Error types for the log sink

use std::io;
use std::path::PathBuf;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, SinkError>;

/// Everything that can go wrong while configuring or driving a sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Invalid configuration detected at construction. Fatal: the sink never starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A filesystem operation failed. Reported and swallowed on the emit path.
    #[error("failed to {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another holder owns the rotation lock
    #[error("rotation lock {} is held by another writer", lock.display())]
    LockUnavailable { lock: PathBuf },

    /// Malformed human size string such as "10X" or "1.5M"
    #[error("invalid size format: {0:?}")]
    InvalidSizeFormat(String),
}

impl SinkError {
    /// Wrap an IO error with the operation and path it relates to
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        SinkError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Check whether this is a lost lock race (a silent skip, not a failure)
    pub fn is_lock_unavailable(&self) -> bool {
        matches!(self, SinkError::LockUnavailable { .. })
    }
}
