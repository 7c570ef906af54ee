//! Buffered write and rotation engine
//!
//! Provides the log sink together with its write buffer, rotation policy, lock-guarded
//! rotation executor, and retention sweep for rotated files.

mod buffer;
mod policy;
mod retention;
mod rotation;
mod sink;

pub use buffer::{WriteBuffer, OVERFLOW_FACTOR};
pub use policy::{
    is_rotation_due, period_suffix, rotated_path, timestamp_suffix, RotationKind, RotationTrigger,
};
pub use retention::{rotated_files, sweep, SweepReport};
pub use rotation::{lock_path, RotationExecutor, RotationLock, RotationOutcome, STALE_LOCK_AGE};
pub use sink::{EmitOutcome, LogSink, RotationStatus, SinkState};
