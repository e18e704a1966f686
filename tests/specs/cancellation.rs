//! Scenario 2: cancellation of a running task.

use crate::prelude::*;
use fleetops_adapters::{AgentEngine, SandboxBackend};
use fleetops_core::{Sandbox, TaskMode, TaskStatus};
use fleetops_engine::pipeline::EngineFactory;
use std::sync::Arc;
use std::time::Duration;

/// An engine that sleeps on every prompt, long enough for a test to
/// reliably observe the task in `Running` before it finishes.
struct SlowEngine;

#[async_trait::async_trait]
impl AgentEngine for SlowEngine {
    fn name(&self) -> &str {
        "slow"
    }

    async fn start(&mut self, _sandbox: &Sandbox, _backend: &dyn SandboxBackend) -> Result<(), fleetops_adapters::AdapterError> {
        Ok(())
    }

    async fn execute_prompt(
        &self,
        _sandbox: &Sandbox,
        _backend: &dyn SandboxBackend,
        _prompt: &str,
        _timeout: Duration,
    ) -> Result<(bool, String), fleetops_adapters::AdapterError> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok((true, String::new()))
    }

    async fn stop(&mut self, _sandbox: &Sandbox, _backend: &dyn SandboxBackend) -> Result<(), fleetops_adapters::AdapterError> {
        Ok(())
    }
}

fn slow_engine_factory() -> EngineFactory {
    Arc::new(|| Ok(Box::new(SlowEngine) as Box<dyn AgentEngine>))
}

#[tokio::test]
async fn cancelling_a_running_task_terminates_it_and_releases_the_sandbox() {
    let harness = Harness::with_engine_factory(1, slow_engine_factory());
    harness.start().await;

    let id = harness.queue.submit(task(TaskMode::Code, "Slow task to cancel mid-flight")).await;

    harness.wait_for_status(&id, TaskStatus::Running).await;

    assert!(harness.queue.cancel(&id).await);

    let finished = harness.wait_for_terminal(&id).await;
    assert_eq!(finished.status, TaskStatus::Cancelled);

    // A second cancel on an already-terminal task is a no-op.
    assert!(!harness.queue.cancel(&id).await);

    harness.shutdown().await;
}
