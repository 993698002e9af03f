// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline queue for telemetry that could not be delivered.
//!
//! Uses JSONL format for durability - each record is written as a single line
//! and fsynced immediately. On reconnect, queued records are replayed to the
//! backend in order.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fieldsync_core::TelemetryRecord;

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another process owns the queue.
    #[error("queue is locked by another process: {0}")]
    Locked(String),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// FIFO of undelivered telemetry records.
///
/// Records are stored in a JSONL file, one record per line. An exclusive
/// lock on a sibling `.lock` file is held for the queue's lifetime so only
/// one process appends and drains.
pub struct OfflineQueue {
    path: PathBuf,
    _lock: File,
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("path", &self.path)
            .finish()
    }
}

impl OfflineQueue {
    /// Create or open an offline queue at the given path.
    pub fn open(path: &Path) -> QueueResult<Self> {
        use fs2::FileExt;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let lock_path = path.with_extension("lock");
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|_| QueueError::Locked(lock_path.display().to_string()))?;

        OpenOptions::new().create(true).append(true).open(path)?;

        Ok(OfflineQueue {
            path: path.to_path_buf(),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record. It is on disk when this returns.
    pub fn enqueue(&mut self, record: &TelemetryRecord) -> QueueResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(record)?;
        writeln!(file, "{}", json)?;
        file.sync_all()?;

        Ok(())
    }

    /// Read all queued records without removing them.
    pub fn peek_all(&self) -> QueueResult<Vec<TelemetryRecord>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }

        Ok(records)
    }

    /// Snapshot the queue and clear it.
    pub fn take_all(&mut self) -> QueueResult<Vec<TelemetryRecord>> {
        let records = self.peek_all()?;
        if !records.is_empty() {
            self.clear()?;
        }
        Ok(records)
    }

    /// Put records back ahead of anything appended since they were taken.
    pub fn requeue_front(&mut self, records: &[TelemetryRecord]) -> QueueResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let newer = self.peek_all()?;
        self.rewrite(records.iter().chain(newer.iter()))
    }

    /// Clear all queued records.
    pub fn clear(&mut self) -> QueueResult<()> {
        let file = File::create(&self.path)?;
        file.sync_all()?;
        Ok(())
    }

    /// Get the number of queued records.
    pub fn len(&self) -> QueueResult<usize> {
        Ok(self.peek_all()?.len())
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove the first N records from the queue.
    pub fn remove_first(&mut self, count: usize) -> QueueResult<()> {
        let records = self.peek_all()?;
        if count >= records.len() {
            return self.clear();
        }
        self.rewrite(records[count..].iter())
    }

    fn rewrite<'a>(&mut self, records: impl Iterator<Item = &'a TelemetryRecord>) -> QueueResult<()> {
        let mut file = File::create(&self.path)?;
        for record in records {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{}", json)?;
        }
        file.sync_all()?;
        Ok(())
    }
}
