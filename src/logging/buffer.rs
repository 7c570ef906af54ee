//! In-memory write buffer
//!
//! Holds formatted records until enough accumulate to be worth a write, then appends
//! them to the active file in one call. While the file cannot be written the buffer keeps
//! at most `OVERFLOW_FACTOR` times its capacity, dropping the oldest records beyond that.

use std::collections::VecDeque;
use std::path::Path;

use crate::error::{Result, SinkError};
use crate::fs::FileSystem;

/// Pending records kept across failed flushes, as a multiple of the capacity
pub const OVERFLOW_FACTOR: usize = 64;

/// Ordered batch of pending records, bounded by a record count
#[derive(Debug)]
pub struct WriteBuffer {
    /// Pending records, oldest first
    records: VecDeque<String>,
    /// Record count that triggers a flush
    capacity: usize,
    /// Hard ceiling on pending records
    limit: usize,
    /// Records discarded since the last successful flush
    dropped: usize,
}

impl WriteBuffer {
    /// Create an empty buffer
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            limit: capacity.saturating_mul(OVERFLOW_FACTOR),
            dropped: 0,
        }
    }

    /// Add a record
    ///
    /// Returns true once the buffer has reached capacity and must be flushed. At the hard
    /// ceiling the oldest pending record is discarded to make room.
    pub fn append(&mut self, record: impl Into<String>) -> bool {
        if self.records.len() >= self.limit {
            self.records.pop_front();
            self.dropped += 1;
            if self.dropped == 1 {
                tracing::warn!(
                    limit = self.limit,
                    "Log buffer full and file unwritable, dropping oldest records"
                );
            }
        }
        self.records.push_back(record.into());
        self.is_full()
    }

    /// Check whether the pending count has reached capacity
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    /// Number of pending records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Maximum number of records held while flushes keep failing
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Records discarded since the last successful flush
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Pending records, oldest first
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(String::as_str)
    }

    /// Write every pending record to `path` in a single append
    ///
    /// Without a path, or with nothing pending, this does nothing. On failure the
    /// buffer is kept intact so the caller can retry.
    pub fn flush(&mut self, fs: &dyn FileSystem, path: Option<&Path>) -> Result<usize> {
        let Some(path) = path else {
            return Ok(0);
        };
        if self.records.is_empty() {
            return Ok(0);
        }

        let mut data = String::with_capacity(self.records.iter().map(|r| r.len() + 1).sum());
        for record in &self.records {
            data.push_str(record);
            data.push('\n');
        }

        fs.append(path, data.as_bytes())
            .map_err(|e| SinkError::io("append to", path, e))?;

        let written = self.records.len();
        self.records.clear();
        if self.dropped > 0 {
            tracing::warn!(
                dropped = self.dropped,
                path = %path.display(),
                "Log file writable again, records were dropped while it was not"
            );
            self.dropped = 0;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::memory::MemoryFs;
    use crate::fs::OsFileSystem;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_append_reports_full_at_capacity() {
        let mut buffer = WriteBuffer::new(3);
        assert!(!buffer.append("one"));
        assert!(!buffer.append("two"));
        assert!(buffer.append("three"));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_flush_preserves_order_and_clears() {
        let fs = MemoryFs::new();
        let path = PathBuf::from("/logs/app.log");
        let mut buffer = WriteBuffer::new(10);

        for i in 0..5 {
            buffer.append(format!("record {}", i));
        }
        assert_eq!(buffer.flush(&fs, Some(&path)).unwrap(), 5);

        assert!(buffer.is_empty());
        assert_eq!(
            fs.read(&path).unwrap(),
            "record 0\nrecord 1\nrecord 2\nrecord 3\nrecord 4\n"
        );
    }

    #[test]
    fn test_flush_without_path_is_noop() {
        let fs = MemoryFs::new();
        let mut buffer = WriteBuffer::new(10);
        buffer.append("kept");

        assert_eq!(buffer.flush(&fs, None).unwrap(), 0);
        assert_eq!(buffer.len(), 1);
        assert!(fs.paths().is_empty());
    }

    #[test]
    fn test_flush_empty_is_noop() {
        let fs = MemoryFs::new();
        let path = PathBuf::from("/logs/app.log");
        let mut buffer = WriteBuffer::new(10);

        assert_eq!(buffer.flush(&fs, Some(&path)).unwrap(), 0);
        assert!(!fs.exists(&path));
    }

    #[test]
    fn test_failed_flush_keeps_records() {
        let fs = MemoryFs::new();
        let path = PathBuf::from("/logs/app.log");
        let mut buffer = WriteBuffer::new(10);
        buffer.append("first");
        buffer.append("second");

        fs.fail("append");
        let err = buffer.flush(&fs, Some(&path)).unwrap_err();
        assert!(matches!(err, SinkError::Io { .. }));
        assert_eq!(buffer.pending().collect::<Vec<_>>(), ["first", "second"]);

        fs.heal("append");
        buffer.flush(&fs, Some(&path)).unwrap();
        assert_eq!(fs.read(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_unwritable_file_bounds_pending_records() {
        let fs = MemoryFs::new();
        let path = PathBuf::from("/logs/app.log");
        let mut buffer = WriteBuffer::new(3);
        fs.fail("append");

        for i in 0..10_000 {
            if buffer.append(format!("record {}", i)) {
                assert!(buffer.flush(&fs, Some(&path)).is_err());
            }
        }

        assert_eq!(buffer.limit(), 3 * OVERFLOW_FACTOR);
        assert_eq!(buffer.len(), buffer.limit());
        assert_eq!(buffer.dropped(), 10_000 - buffer.limit());
        assert_eq!(
            buffer.pending().next(),
            Some(format!("record {}", 10_000 - buffer.limit()).as_str())
        );

        fs.heal("append");
        assert_eq!(buffer.flush(&fs, Some(&path)).unwrap(), 3 * OVERFLOW_FACTOR);
        assert_eq!(buffer.dropped(), 0);
        assert_eq!(fs.line_count(&path), 3 * OVERFLOW_FACTOR);
        assert!(fs.read(&path).unwrap().ends_with("record 9999\n"));
    }

    #[test]
    fn test_flush_appends_to_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        std::fs::write(&path, "existing\n").unwrap();

        let mut buffer = WriteBuffer::new(2);
        buffer.append("new");
        buffer.flush(&OsFileSystem, Some(&path)).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing\nnew\n");
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut buffer = WriteBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        assert!(buffer.append("x"));
    }
}
