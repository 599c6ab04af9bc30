// history.rs

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Character that introduces a recall expression (`!!`, `!n`, `!-n`).
pub const RECALL_SENTINEL: char = '!';

/// Reading or writing a history file failed.
#[derive(Debug, Error)]
#[error("{}: {}", .path.display(), .source)]
pub struct PersistError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl PersistError {
    fn at(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| PersistError { path: path.to_path_buf(), source }
    }

    /// The file does not exist yet (first run with a fresh `HISTFILE`).
    pub fn is_missing(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

/// Whether a logical index can still be fetched from the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retention {
    Retained,
    /// Index was never handed out (`n < 1` or `n > total_entered`).
    NeverExisted,
    /// Index was handed out but has since been overwritten.
    Evicted,
}

/// Fixed-capacity circular store of command lines.
///
/// Every appended line gets a 1-based logical index that is never reused.
/// Logical index `n` lives in slot `(n - 1) % capacity` until it is
/// overwritten by index `n + capacity`.
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    total_entered: usize,
    slots: Vec<String>,
}

impl HistoryStore {
    /// Panics if `capacity` is zero; the config layer rejects that value.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be at least 1");
        Self {
            capacity,
            total_entered: 0,
            slots: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_entered(&self) -> usize {
        self.total_entered
    }

    pub fn is_empty(&self) -> bool {
        self.total_entered == 0
    }

    /// Records `line`, returning `false` (and storing nothing) for empty
    /// lines and lines starting with the recall sentinel.
    pub fn append(&mut self, line: &str) -> bool {
        if line.is_empty() || line.starts_with(RECALL_SENTINEL) {
            return false;
        }
        let slot = self.total_entered % self.capacity;
        if slot < self.slots.len() {
            self.slots[slot] = line.to_string();
        } else {
            self.slots.push(line.to_string());
        }
        self.total_entered += 1;
        true
    }

    /// Smallest logical index still held by the buffer.
    fn oldest_retained(&self) -> usize {
        (self.total_entered + 1).saturating_sub(self.capacity).max(1)
    }

    pub fn retention(&self, n: usize) -> Retention {
        if n < 1 || n > self.total_entered {
            Retention::NeverExisted
        } else if n < self.oldest_retained() {
            Retention::Evicted
        } else {
            Retention::Retained
        }
    }

    pub fn exists(&self, n: usize) -> bool {
        self.retention(n) == Retention::Retained
    }

    pub fn get(&self, n: usize) -> Option<&str> {
        if !self.exists(n) {
            return None;
        }
        Some(self.slots[(n - 1) % self.capacity].as_str())
    }

    /// Retained entries as `(logical_index, line)` in increasing index order.
    pub fn render_all(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        (self.oldest_retained()..=self.total_entered)
            .filter_map(move |n| self.get(n).map(|line| (n, line)))
    }

    /// The last `count` retained entries, oldest first.
    pub fn render_last(&self, count: usize) -> impl Iterator<Item = (usize, &str)> + '_ {
        let retained = self.total_entered + 1 - self.oldest_retained();
        self.render_all().skip(retained.saturating_sub(count))
    }

    /// Appends every line of `path` through [`HistoryStore::append`].
    /// Returns how many lines were accepted.
    pub fn load_from(&mut self, path: &Path) -> Result<usize, PersistError> {
        let reader = BufReader::new(File::open(path).map_err(PersistError::at(path))?);
        let mut accepted = 0;
        for line in reader.lines() {
            if self.append(&line.map_err(PersistError::at(path))?) {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    /// Writes the retained window to `path`, one line per entry.
    pub fn save_to(&self, path: &Path) -> Result<(), PersistError> {
        let write_all = || -> io::Result<()> {
            let mut file = File::create(path)?;
            for (_, line) in self.render_all() {
                writeln!(file, "{}", line)?;
            }
            file.flush()
        };
        write_all().map_err(PersistError::at(path))
    }
}
