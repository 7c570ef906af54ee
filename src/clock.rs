//! Wall-clock source
//!
//! Period suffixes and retention ages are computed from an injected clock so that
//! rotation decisions can be tested without waiting for midnight.

use chrono::{DateTime, Local};

/// Source of the current local time
pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> DateTime<Local>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[cfg(test)]
pub use fixed::FixedClock;
