// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only store of terminal task records, backed by a single JSON
//! file. Not a database: every `append` rewrites the whole file via a
//! write-tmp/fsync/rename sequence so a crash mid-write never corrupts
//! the previous contents.

use fleetops_core::Task;
use parking_lot::Mutex;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::StorageError;

pub struct TaskStore {
    path: PathBuf,
    records: Mutex<Vec<Task>>,
}

impl TaskStore {
    /// Load existing history from `path`, if any. A missing file starts
    /// empty; a corrupted file also starts empty, with a warning logged
    /// rather than surfacing an error — task history is best-effort.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "task history file is corrupt, starting empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read task history, starting empty");
                Vec::new()
            }
        };
        Self {
            path,
            records: Mutex::new(records),
        }
    }

    /// Append a terminal task record and persist the full history.
    pub fn append(&self, task: Task) -> Result<(), StorageError> {
        debug_assert!(task.status.is_terminal());
        let mut records = self.records.lock();
        records.push(task);
        write_atomic(&self.path, &records)
    }

    pub fn list(&self) -> Vec<Task> {
        self.records.lock().clone()
    }
}

fn write_atomic(path: &Path, records: &[Task]) -> Result<(), StorageError> {
    let json = serde_json::to_vec_pretty(records)?;
    let tmp_path = path.with_extension("json.tmp");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let mut file = File::create(&tmp_path).map_err(|e| StorageError::Io {
        path: tmp_path.clone(),
        source: e,
    })?;
    file.write_all(&json).map_err(|e| StorageError::Io {
        path: tmp_path.clone(),
        source: e,
    })?;
    file.sync_all().map_err(|e| StorageError::Io {
        path: tmp_path.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| StorageError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
#[path = "task_store_tests.rs"]
mod tests;
