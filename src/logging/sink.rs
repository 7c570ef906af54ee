//! Log sink
//!
//! The entry point for emitted records. Each record is filtered by level, the active
//! file is rotated if the policy says so, and the record is buffered until the buffer
//! fills up. Runtime I/O problems are reported as warnings and never returned from
//! `emit`, so logging cannot take the host process down (except on purpose, via FATAL).

use std::path::Path;

use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::config::{Level, RotationStrategy, SinkConfig};
use crate::error::{Result, SinkError};
use crate::fs::{FileSystem, OsFileSystem};

use super::buffer::WriteBuffer;
use super::policy::{is_rotation_due, RotationKind};
use super::retention::rotated_files;
use super::rotation::{RotationExecutor, RotationOutcome};

/// Lifecycle of a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Configuration not yet validated
    Uninitialized,
    /// Accepting records
    Ready,
    /// Final flush done; every later record is dropped
    Terminated,
}

/// What happened to an emitted record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /// Buffered (and possibly flushed)
    Written,
    /// Below the configured minimum level
    Filtered,
    /// FATAL record written and flushed. The host must exit with status 1.
    Fatal,
    /// The sink is terminated
    Dropped,
}

/// Rotation settings and on-disk state, for operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationStatus {
    pub enabled: bool,
    pub strategy: RotationStrategy,
    pub max_size: u64,
    pub keep_days: u64,
    /// Size of the active file in bytes (0 when missing)
    pub current_size: u64,
    /// Number of rotated files next to the active file
    pub rotated_count: usize,
}

/// Buffered, rotating log sink
pub struct LogSink {
    config: SinkConfig,
    fs: Box<dyn FileSystem>,
    clock: Box<dyn Clock>,
    buffer: WriteBuffer,
    state: SinkState,
}

impl LogSink {
    /// Create a sink writing through the real filesystem
    pub fn new(config: SinkConfig) -> Result<Self> {
        Self::with_parts(config, Box::new(OsFileSystem), Box::new(SystemClock))
    }

    /// Create a sink with explicit filesystem and clock implementations
    ///
    /// Validates the configuration and creates the active file and its parent directory.
    pub fn with_parts(
        config: SinkConfig,
        fs: Box<dyn FileSystem>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        let mut sink = Self {
            buffer: WriteBuffer::new(config.buffer_size),
            config,
            fs,
            clock,
            state: SinkState::Uninitialized,
        };
        sink.initialize()?;
        Ok(sink)
    }

    fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;

        if let Some(file) = &self.config.file {
            if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
                self.fs.create_dir_all(parent).map_err(|e| {
                    SinkError::Configuration(format!(
                        "cannot create log directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
            self.fs.touch(file).map_err(|e| {
                SinkError::Configuration(format!(
                    "cannot create log file {}: {}",
                    file.display(),
                    e
                ))
            })?;
        }

        self.state = SinkState::Ready;
        tracing::debug!(
            name = %self.config.name,
            file = ?self.config.file,
            strategy = %self.config.strategy,
            "Log sink ready"
        );
        Ok(())
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    /// Active file path, if file output is enabled
    pub fn active_path(&self) -> Option<&Path> {
        self.config.file.as_deref()
    }

    /// Number of records waiting in memory
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Emit one pre-formatted record
    pub fn emit(&mut self, level: Level, record: impl Into<String>) -> EmitOutcome {
        if self.state != SinkState::Ready {
            return EmitOutcome::Dropped;
        }
        if level < self.config.level {
            return EmitOutcome::Filtered;
        }

        // Console-only sink: nothing to buffer
        if self.config.file.is_none() {
            if level.is_fatal() {
                self.state = SinkState::Terminated;
                return EmitOutcome::Fatal;
            }
            return EmitOutcome::Written;
        }

        self.rotate_if_due();

        let full = self.buffer.append(record);

        if level.is_fatal() {
            self.terminate();
            return EmitOutcome::Fatal;
        }

        if full {
            if let Err(e) = self.buffer.flush(self.fs.as_ref(), self.config.file.as_deref()) {
                tracing::warn!(error = %e, pending = self.buffer.len(), "Failed to flush log buffer");
            }
        }

        EmitOutcome::Written
    }

    /// Write all pending records to the active file
    pub fn flush(&mut self) -> Result<usize> {
        if self.state != SinkState::Ready {
            return Ok(0);
        }
        self.buffer
            .flush(self.fs.as_ref(), self.config.file.as_deref())
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to flush log buffer");
                e
            })
    }

    /// Rotate the active file right now, regardless of strategy
    pub fn rotate_now(&mut self) -> Result<RotationOutcome> {
        if self.state != SinkState::Ready {
            return Ok(RotationOutcome::NothingToRotate);
        }
        let executor = RotationExecutor::new(&self.config, self.fs.as_ref(), self.clock.as_ref());
        executor.rotate(RotationKind::Manual, &mut self.buffer)
    }

    /// Report rotation settings and the current state of the files
    pub fn status(&self) -> RotationStatus {
        let (current_size, rotated_count) = match self.config.file.as_deref() {
            Some(active) => (
                self.fs.file_len(active).unwrap_or(0),
                rotated_files(self.fs.as_ref(), active).len(),
            ),
            None => (0, 0),
        };
        RotationStatus {
            enabled: self.config.rotation_active(),
            strategy: self.config.strategy,
            max_size: self.config.max_size,
            keep_days: self.config.keep_days,
            current_size,
            rotated_count,
        }
    }

    /// Flush everything and stop accepting records
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state != SinkState::Ready {
            return Ok(());
        }
        let result = self
            .buffer
            .flush(self.fs.as_ref(), self.config.file.as_deref())
            .map(|_| ());
        self.state = SinkState::Terminated;
        result
    }

    fn terminate(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, lost = self.buffer.len(), "Final log flush failed");
        }
    }

    fn rotate_if_due(&mut self) {
        let Some(trigger) =
            is_rotation_due(&self.config, self.fs.as_ref(), self.clock.now())
        else {
            return;
        };

        let executor = RotationExecutor::new(&self.config, self.fs.as_ref(), self.clock.as_ref());
        match executor.rotate(RotationKind::Policy(trigger), &mut self.buffer) {
            Ok(outcome) => tracing::debug!(?outcome, "Rotation check finished"),
            Err(e) if e.is_lock_unavailable() => {
                tracing::debug!(error = %e, "Rotation in progress elsewhere, skipping");
            }
            Err(e) => tracing::warn!(error = %e, "Log rotation failed"),
        }
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        self.terminate();
    }
}
