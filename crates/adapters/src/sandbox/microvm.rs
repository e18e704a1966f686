// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Firecracker-style microVM sandbox backend.
//!
//! This is an honest stub: it models the snapshot/restore control flow the
//! warm pool expects from a microVM backend, but does not speak the real
//! Firecracker API socket protocol. `exec` and `health_check` always
//! succeed. Swap this out for a real implementation before pointing it at
//! production traffic.

use async_trait::async_trait;
use fleetops_core::{Sandbox, SandboxBackendKind, SandboxId, SandboxState, SystemClock};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use super::{ExecOutput, SandboxBackend, SandboxSpec};
use crate::error::AdapterError;

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub snapshot_dir: PathBuf,
    pub kernel_image: PathBuf,
    pub rootfs_image: PathBuf,
}

pub struct MicrovmBackend {
    config: SnapshotConfig,
}

impl MicrovmBackend {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SandboxBackend for MicrovmBackend {
    fn kind(&self) -> SandboxBackendKind {
        SandboxBackendKind::Microvm
    }

    async fn create(&self, spec: &SandboxSpec) -> Result<Sandbox, AdapterError> {
        let id = format!("microvm-{}", Uuid::new_v4());
        let snapshot_path = self.config.snapshot_dir.join(format!("{id}.snap"));
        // Stub: a real implementation would clone the paused snapshot's
        // memory file and disk overlay at `snapshot_path` and resume it.
        let _ = snapshot_path;

        let clock = SystemClock;
        let mut sandbox = Sandbox::new(
            SandboxId::new(id.clone()),
            SandboxBackendKind::Microvm,
            spec.memory_mb,
            spec.vcpus,
            &clock,
        );
        sandbox.handle = Some(id);
        Ok(sandbox)
    }

    async fn warm(&self, sandbox: &mut Sandbox) -> Result<(), AdapterError> {
        sandbox.state = SandboxState::Warming;
        sandbox.state = SandboxState::Ready;
        Ok(())
    }

    async fn destroy(&self, _sandbox: &Sandbox) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn exec(&self, _sandbox: &Sandbox, _command: &str, _timeout: Duration) -> ExecOutput {
        ExecOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    async fn health_check(&self, _sandbox: &Sandbox) -> Result<(), AdapterError> {
        Ok(())
    }
}
