//! Fire-and-forget sink for gameplay events ("Character a spawned", ...).
//!
//! Handlers call [`EventLog::log_event`] while holding the world lock, so an
//! implementation must never block or fail. [`FileEventLog`] hands each line
//! to a background task that owns the file.

use chrono::Utc;
use log::{debug, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub trait EventLog: Send + Sync {
    fn log_event(&self, event: &str);
}

/// Appends `"{RFC 3339 timestamp} | {event}"` lines to a file.
pub struct FileEventLog {
    path: PathBuf,
    tx: mpsc::UnboundedSender<String>,
}

impl FileEventLog {
    /// Opens (or creates) `path` for appending and starts the writer task.
    ///
    /// The task drains every queued line and exits once the last handle to
    /// this log is dropped; await the returned handle to be sure the file is
    /// flushed.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<(Self, JoinHandle<()>)> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let task_path = path.clone();
        let handle = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    warn!("Failed to write event to {}: {}", task_path.display(), e);
                }
            }
            if let Err(e) = file.flush().await {
                warn!("Failed to flush {}: {}", task_path.display(), e);
            }
            debug!("Event log writer for {} stopped", task_path.display());
        });

        Ok((Self { path, tx }, handle))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventLog for FileEventLog {
    fn log_event(&self, event: &str) {
        let line = format!("{} | {}\n", Utc::now().to_rfc3339(), event);
        if self.tx.send(line).is_err() {
            warn!("Event log writer is gone, dropping: {}", event);
        }
    }
}

/// Keeps events in memory, in the order they were logged.
#[derive(Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<String>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events().iter().any(|e| e == event)
    }
}

impl EventLog for MemoryEventLog {
    fn log_event(&self, event: &str) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.to_string());
    }
}
