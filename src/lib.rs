//! logsink - buffered, rotating file logging for scripts and processes
//!
//! The library exposes the log sink (leveled emission, write buffering, size and
//! calendar based rotation with a cross-process lock, retention sweeps) plus the small
//! collaborators the `logsink` binary needs: environment configuration, record
//! rendering, and signal-driven shutdown.

pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod fs;
pub mod logging;
pub mod shutdown;
pub mod size;

pub use config::{Level, RotationStrategy, SinkConfig};
pub use error::{Result, SinkError};
pub use logging::{EmitOutcome, LogSink, RotationOutcome, RotationStatus};
