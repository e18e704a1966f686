// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandbox value type: an ephemeral container or microVM held by the warm pool.

use crate::clock::Clock;
use crate::{SandboxId, TaskId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which backend produced a sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxBackendKind {
    Container,
    Microvm,
}

/// One-way lifecycle: `Creating -> Warming -> Ready -> Claimed -> Cleaning
/// -> Destroyed`, with `Error` reachable from any non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SandboxState {
    Creating,
    Warming,
    Ready,
    Claimed,
    Cleaning,
    Destroyed,
    Error { reason: String },
}

impl SandboxState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Destroyed | Self::Error { .. })
    }
}

/// An ephemeral execution environment handed out by the warm pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sandbox {
    pub id: SandboxId,
    pub backend: SandboxBackendKind,
    pub state: SandboxState,
    pub memory_mb: u32,
    pub vcpus: u32,
    /// Backend-opaque handle (container id, microVM socket path, ...).
    pub handle: Option<String>,
    pub address: Option<String>,
    pub task_id: Option<TaskId>,
    pub secrets_dir: Option<PathBuf>,
    pub created_at_ms: u64,
    pub claimed_at_ms: Option<u64>,
    pub released_at_ms: Option<u64>,
}

impl Sandbox {
    pub fn new(
        id: SandboxId,
        backend: SandboxBackendKind,
        memory_mb: u32,
        vcpus: u32,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id,
            backend,
            state: SandboxState::Creating,
            memory_mb,
            vcpus,
            handle: None,
            address: None,
            task_id: None,
            secrets_dir: None,
            created_at_ms: clock.epoch_ms(),
            claimed_at_ms: None,
            released_at_ms: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SandboxState::Ready)
    }

    /// Bind this sandbox to a task. Only valid from `Ready`.
    pub fn claim(&mut self, task_id: TaskId, clock: &impl Clock) {
        self.state = SandboxState::Claimed;
        self.task_id = Some(task_id);
        self.claimed_at_ms = Some(clock.epoch_ms());
    }

    /// Begin releasing this sandbox back to the backend for destruction.
    pub fn release(&mut self, clock: &impl Clock) {
        self.state = SandboxState::Cleaning;
        self.task_id = None;
        self.released_at_ms = Some(clock.epoch_ms());
    }
}

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
