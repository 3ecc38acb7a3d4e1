//! Debounced rating writes
//!
//! Each rating change restarts a quiet-period timer with a fresh snapshot
//! of the rows; only the last snapshot of a burst reaches the disk. An
//! interval of zero disables the timer so only explicit saves write.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{self, JoinHandle};

use super::ratings::{write_scores, RatingRow};
use crate::error::PersistenceError;

/// Result of one write, tagged with the edit revision it captured
#[derive(Debug)]
pub struct SaveOutcome {
    pub revision: u64,
    pub manual: bool,
    pub result: Result<PathBuf, PersistenceError>,
}

/// Serialises writes and drops snapshots older than what is on disk
struct Writer {
    folder: PathBuf,
    written: Mutex<u64>,
}

impl Writer {
    fn write(&self, revision: u64, rows: &[RatingRow]) -> Result<PathBuf, PersistenceError> {
        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        if revision < *written {
            tracing::debug!("Skipping stale rating snapshot {} (disk has {})", revision, *written);
            return Ok(super::ratings::sidecar_path(&self.folder));
        }
        let path = write_scores(&self.folder, rows)?;
        *written = revision;
        Ok(path)
    }
}

pub struct Autosave {
    interval: Option<Duration>,
    writer: Arc<Writer>,
    runtime: Handle,
    pending: Option<JoinHandle<()>>,
    outcomes: UnboundedSender<SaveOutcome>,
}

impl Autosave {
    pub fn new(
        folder: &Path,
        interval: Option<Duration>,
        runtime: Handle,
    ) -> (Self, UnboundedReceiver<SaveOutcome>) {
        let (outcomes, rx) = mpsc::unbounded_channel();
        let writer = Arc::new(Writer {
            folder: folder.to_path_buf(),
            written: Mutex::new(0),
        });
        (
            Self {
                interval,
                writer,
                runtime,
                pending: None,
                outcomes,
            },
            rx,
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Restart the quiet period with `rows`. Returns `false` when automatic
    /// writes are disabled.
    pub fn schedule(&mut self, revision: u64, rows: Vec<RatingRow>) -> bool {
        let Some(interval) = self.interval else {
            return false;
        };
        self.cancel();
        self.pending = Some(self.spawn_write(Some(interval), revision, rows, false));
        true
    }

    /// Write right away, replacing any pending timer. The outcome arrives on
    /// the channel like any other write.
    pub fn save_now(&mut self, revision: u64, rows: Vec<RatingRow>) {
        self.cancel();
        self.pending = Some(self.spawn_write(None, revision, rows, true));
    }

    /// Write on the calling thread. Used when the session is torn down.
    pub fn flush_blocking(&mut self, revision: u64, rows: &[RatingRow]) -> Result<PathBuf, PersistenceError> {
        self.cancel();
        self.writer.write(revision, rows)
    }

    /// Drop a timer that has not fired yet
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    fn spawn_write(
        &self,
        delay: Option<Duration>,
        revision: u64,
        rows: Vec<RatingRow>,
        manual: bool,
    ) -> JoinHandle<()> {
        let writer = Arc::clone(&self.writer);
        let outcomes = self.outcomes.clone();
        self.runtime.spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            // Once the blocking write starts it runs to completion even if
            // this task is aborted.
            let result = task::spawn_blocking(move || writer.write(revision, &rows))
                .await
                .map_err(|e| PersistenceError::Task(e.to_string()))
                .and_then(|result| result);
            let _ = outcomes.send(SaveOutcome {
                revision,
                manual,
                result,
            });
        })
    }
}
