// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds for the execution plane.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("adapter error: {0}")]
    Adapter(#[from] fleetops_adapters::AdapterError),

    #[error("storage error: {0}")]
    Storage(#[from] fleetops_storage::StorageError),

    #[error("invalid repository url: {0}")]
    RepoUrl(#[from] fleetops_core::RepoUrlError),

    #[error("peer review task is missing a target branch")]
    MissingTargetBranch,

    #[error("warm pool has no ready sandbox and emergency creation failed: {0}")]
    PoolExhausted(String),

    #[error("task {0} timed out after {1:?}")]
    TaskTimeout(String, std::time::Duration),

    #[error("task {0} was cancelled")]
    TaskCancelled(String),

    #[error("queue is at capacity ({0} active tasks)")]
    QueueFull(usize),

    #[error("unknown task id: {0}")]
    UnknownTask(String),
}
