// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandbox backend contract: create, warm, destroy and exec into an
//! ephemeral execution environment (container or microVM).

pub mod container;
#[cfg(feature = "microvm")]
pub mod microvm;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use fleetops_core::Sandbox;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::AdapterError;

pub use container::ContainerBackend;
#[cfg(feature = "microvm")]
pub use microvm::MicrovmBackend;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSandboxBackend;

/// Static parameters used to create a sandbox. Distinct from `Sandbox`
/// (the runtime record) because the spec describes what to build, not
/// what was built.
#[derive(Debug, Clone)]
pub struct SandboxSpec {
    pub memory_mb: u32,
    pub vcpus: u32,
    pub image: String,
    pub env: HashMap<String, String>,
    /// Values written to per-sandbox secret files, never embedded in URLs
    /// or environment variables.
    pub secrets: HashMap<String, String>,
}

impl Default for SandboxSpec {
    fn default() -> Self {
        Self {
            memory_mb: 2048,
            vcpus: 2,
            image: "fleetops/agent-runtime:latest".to_string(),
            env: HashMap::new(),
            secrets: HashMap::new(),
        }
    }
}

/// Exit code, stdout and stderr of a command run inside a sandbox.
/// Command failures are represented in-band (non-zero exit code); only
/// backend-level failures (the sandbox itself is unreachable) are errors.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Backend responsible for the physical lifecycle of a sandbox. The warm
/// pool manager is the only caller of `create`/`warm`/`destroy`; the agent
/// runner is the only caller of `exec`.
#[async_trait]
pub trait SandboxBackend: Send + Sync {
    /// Which kind of sandbox this backend produces, for pool stats.
    fn kind(&self) -> fleetops_core::SandboxBackendKind;

    async fn create(&self, spec: &SandboxSpec) -> Result<Sandbox, AdapterError>;

    /// Bring a freshly-created sandbox to `Ready` (e.g. wait for the
    /// runtime inside it to accept commands).
    async fn warm(&self, sandbox: &mut Sandbox) -> Result<(), AdapterError>;

    async fn destroy(&self, sandbox: &Sandbox) -> Result<(), AdapterError>;

    /// Run a shell command inside the sandbox. Never returns `Err` for a
    /// failing command; only for a backend that can't reach the sandbox
    /// at all. On timeout, returns exit code 124 with empty output.
    async fn exec(&self, sandbox: &Sandbox, command: &str, timeout: Duration) -> ExecOutput;

    async fn health_check(&self, sandbox: &Sandbox) -> Result<(), AdapterError>;
}
