// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory sandbox backend for tests: no Docker, no network.

use async_trait::async_trait;
use fleetops_core::{Sandbox, SandboxBackendKind, SandboxId, SandboxState, SystemClock};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{ExecOutput, SandboxBackend, SandboxSpec};
use crate::error::AdapterError;

#[derive(Default)]
pub struct FakeSandboxBackend {
    counter: AtomicUsize,
    destroyed: Mutex<HashSet<String>>,
    fail_create: std::sync::atomic::AtomicBool,
    /// Script of (exit_code, stdout, stderr) tuples returned by successive `exec` calls.
    exec_script: Mutex<Vec<(i32, String, String)>>,
}

impl FakeSandboxBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Queue scripted exec results, consumed in FIFO order; once exhausted,
    /// `exec` returns `(0, "", "")`.
    pub fn push_exec_result(&self, exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) {
        self.exec_script
            .lock()
            .push((exit_code, stdout.into(), stderr.into()));
    }

    pub fn destroyed_ids(&self) -> Vec<String> {
        self.destroyed.lock().iter().cloned().collect()
    }
}

#[async_trait]
impl SandboxBackend for FakeSandboxBackend {
    fn kind(&self) -> SandboxBackendKind {
        SandboxBackendKind::Container
    }

    async fn create(&self, spec: &SandboxSpec) -> Result<Sandbox, AdapterError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AdapterError::SandboxCreate("injected failure".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let id = format!("fake-sandbox-{n}");
        let clock = SystemClock;
        let mut sandbox = Sandbox::new(
            SandboxId::new(id.clone()),
            SandboxBackendKind::Container,
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

    async fn destroy(&self, sandbox: &Sandbox) -> Result<(), AdapterError> {
        self.destroyed.lock().insert(sandbox.id.to_string());
        Ok(())
    }

    async fn exec(&self, _sandbox: &Sandbox, _command: &str, _timeout: Duration) -> ExecOutput {
        let mut script = self.exec_script.lock();
        if script.is_empty() {
            return ExecOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            };
        }
        let (exit_code, stdout, stderr) = script.remove(0);
        ExecOutput {
            exit_code,
            stdout,
            stderr,
        }
    }

    async fn health_check(&self, _sandbox: &Sandbox) -> Result<(), AdapterError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_destroy_round_trip() {
        let backend = FakeSandboxBackend::new();
        let sandbox = backend.create(&SandboxSpec::default()).await.unwrap();
        backend.destroy(&sandbox).await.unwrap();
        assert_eq!(backend.destroyed_ids(), vec![sandbox.id.to_string()]);
    }

    #[tokio::test]
    async fn injected_failure_propagates() {
        let backend = FakeSandboxBackend::new();
        backend.set_fail_create(true);
        assert!(backend.create(&SandboxSpec::default()).await.is_err());
    }

    #[tokio::test]
    async fn exec_script_is_consumed_in_order() {
        let backend = FakeSandboxBackend::new();
        let sandbox = backend.create(&SandboxSpec::default()).await.unwrap();
        backend.push_exec_result(0, "first", "");
        backend.push_exec_result(1, "", "second failed");
        let first = backend.exec(&sandbox, "echo first", Duration::from_secs(1)).await;
        assert_eq!(first.exit_code, 0);
        assert_eq!(first.stdout, "first");
        let second = backend.exec(&sandbox, "echo second", Duration::from_secs(1)).await;
        assert_eq!(second.exit_code, 1);
    }
}
