//! Filesystem primitives used by the sink
//!
//! All cross-process coordination (the rotation lock and the "already rotated for this
//! period" check) is expressed through this trait, so every operation here has to be a
//! single atomic filesystem call on the real implementation.

#[cfg(test)]
pub mod memory;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Filesystem operations needed by the buffer, rotation and retention code
///
/// # Object Safety
/// This trait is object-safe so the sink can hold a `Box<dyn FileSystem>`.
pub trait FileSystem: Send + Sync {
    /// Check whether a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Size of a file in bytes
    fn file_len(&self, path: &Path) -> io::Result<u64>;

    /// Last modification time of a file
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Create a directory and all of its parents
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create a file if it does not exist, leaving existing content alone
    fn touch(&self, path: &Path) -> io::Result<()>;

    /// Append bytes to a file in a single write, creating it if needed
    fn append(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Copy the full contents of `from` into a new file `to`
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Truncate a file to zero length without replacing it
    fn truncate(&self, path: &Path) -> io::Result<()>;

    /// Create a file only if it does not already exist
    ///
    /// Fails with `ErrorKind::AlreadyExists` when another writer got there first.
    fn create_exclusive(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Delete a file
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// List the regular files directly inside a directory
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// `FileSystem` backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn file_len(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn touch(&self, path: &Path) -> io::Result<()> {
        OpenOptions::new().create(true).append(true).open(path)?;
        Ok(())
    }

    fn append(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        // O_APPEND keeps concurrent writers from clobbering each other
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(data)?;
        file.flush()
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        fs::copy(from, to)
    }

    fn truncate(&self, path: &Path) -> io::Result<()> {
        OpenOptions::new().write(true).open(path)?.set_len(0)
    }

    fn create_exclusive(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        file.write_all(contents)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                files.push(entry.path());
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_creates_and_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let fs = OsFileSystem;

        fs.append(&path, b"one\n").unwrap();
        fs.append(&path, b"two\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
        assert_eq!(fs.file_len(&path).unwrap(), 8);
    }

    #[test]
    fn test_create_exclusive_fails_when_present() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log.lock");
        let fs = OsFileSystem;

        fs.create_exclusive(&path, b"1").unwrap();
        let err = fs.create_exclusive(&path, b"2").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1");
    }

    #[test]
    fn test_truncate_keeps_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let fs = OsFileSystem;

        fs.append(&path, b"content\n").unwrap();
        fs.truncate(&path).unwrap();

        assert!(fs.exists(&path));
        assert_eq!(fs.file_len(&path).unwrap(), 0);
    }

    #[test]
    fn test_list_files_skips_directories() {
        let temp_dir = TempDir::new().unwrap();
        let fs = OsFileSystem;
        fs.touch(&temp_dir.path().join("a.log")).unwrap();
        fs.create_dir_all(&temp_dir.path().join("nested")).unwrap();

        let files = fs.list_files(temp_dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.log"));
    }
}
