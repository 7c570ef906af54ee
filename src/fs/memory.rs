//! In-memory filesystem for tests
//!
//! Clones share state, which lets two sinks stand in for two processes writing to the
//! same log file. Individual operations can be made to fail for error-path tests.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::clock::{Clock, FixedClock};

use super::FileSystem;

#[derive(Debug, Clone)]
struct MemFile {
    data: Vec<u8>,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<PathBuf, MemFile>,
    dirs: HashSet<PathBuf>,
    failing: HashSet<&'static str>,
}

/// Shared in-memory filesystem
#[derive(Debug, Clone)]
pub struct MemoryFs {
    state: Arc<Mutex<State>>,
    clock: Option<FixedClock>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock: None,
        }
    }

    /// Stamp modification times from the given clock instead of the system time
    pub fn with_clock(clock: FixedClock) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock: Some(clock),
        }
    }

    /// Make every future call of `op` fail ("append", "copy", "truncate", "remove", "touch")
    pub fn fail(&self, op: &'static str) {
        self.state.lock().unwrap().failing.insert(op);
    }

    /// Stop failing `op`
    pub fn heal(&self, op: &'static str) {
        self.state.lock().unwrap().failing.remove(op);
    }

    /// Write a file directly, bypassing failure injection
    pub fn put(&self, path: impl Into<PathBuf>, data: &str) {
        let modified = self.now();
        self.state.lock().unwrap().files.insert(
            path.into(),
            MemFile {
                data: data.as_bytes().to_vec(),
                modified,
            },
        );
    }

    pub fn set_modified(&self, path: &Path, modified: SystemTime) {
        if let Some(file) = self.state.lock().unwrap().files.get_mut(path) {
            file.modified = modified;
        }
    }

    /// Read a file as UTF-8, or None if it does not exist
    pub fn read(&self, path: &Path) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|f| String::from_utf8_lossy(&f.data).into_owned())
    }

    /// Number of lines in a file (0 when missing)
    pub fn line_count(&self, path: &Path) -> usize {
        self.read(path).map(|s| s.lines().count()).unwrap_or(0)
    }

    /// All file paths currently stored
    pub fn paths(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().files.keys().cloned().collect()
    }

    fn now(&self) -> SystemTime {
        match &self.clock {
            Some(clock) => SystemTime::from(clock.now()),
            None => SystemTime::now(),
        }
    }

    fn check(&self, state: &State, op: &'static str) -> io::Result<()> {
        if state.failing.contains(op) {
            Err(io::Error::new(io::ErrorKind::Other, format!("injected {} failure", op)))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    )
}

impl FileSystem for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn file_len(&self, path: &Path) -> io::Result<u64> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(path)
            .map(|f| f.data.len() as u64)
            .ok_or_else(|| not_found(path))
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(path)
            .map(|f| f.modified)
            .ok_or_else(|| not_found(path))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, "mkdir")?;
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn touch(&self, path: &Path) -> io::Result<()> {
        let now = self.now();
        let mut state = self.state.lock().unwrap();
        self.check(&state, "touch")?;
        state.files.entry(path.to_path_buf()).or_insert(MemFile {
            data: Vec::new(),
            modified: now,
        });
        Ok(())
    }

    fn append(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let now = self.now();
        let mut state = self.state.lock().unwrap();
        self.check(&state, "append")?;
        let file = state.files.entry(path.to_path_buf()).or_insert(MemFile {
            data: Vec::new(),
            modified: now,
        });
        file.data.extend_from_slice(data);
        file.modified = now;
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        let now = self.now();
        let mut state = self.state.lock().unwrap();
        self.check(&state, "copy")?;
        let data = state
            .files
            .get(from)
            .map(|f| f.data.clone())
            .ok_or_else(|| not_found(from))?;
        let len = data.len() as u64;
        state.files.insert(
            to.to_path_buf(),
            MemFile {
                data,
                modified: now,
            },
        );
        Ok(len)
    }

    fn truncate(&self, path: &Path) -> io::Result<()> {
        let now = self.now();
        let mut state = self.state.lock().unwrap();
        self.check(&state, "truncate")?;
        let file = state.files.get_mut(path).ok_or_else(|| not_found(path))?;
        file.data.clear();
        file.modified = now;
        Ok(())
    }

    fn create_exclusive(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let now = self.now();
        let mut state = self.state.lock().unwrap();
        if state.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists", path.display()),
            ));
        }
        state.files.insert(
            path.to_path_buf(),
            MemFile {
                data: contents.to_vec(),
                modified: now,
            },
        );
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, "remove")?;
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect())
    }
}
