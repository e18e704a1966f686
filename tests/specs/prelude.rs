//! Test helpers for the end-to-end behavioral specifications.
//!
//! These scenarios run entirely in-process against fakes
//! (`FakeSandboxBackend`, `FakeSourceProvider`, `FakeAgentEngine`): no
//! Docker, no network, no LLM. They exercise the public surface of
//! `fleetops-engine` the same way a real ingress (daemon, API handler)
//! would: submit a task, poll for a terminal status, inspect the result.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use fleetops_adapters::sandbox::SandboxSpec;
use fleetops_adapters::{AgentEngine, FakeAgentEngine, FakeSandboxBackend, FakeSourceProvider};
use fleetops_core::{GitProvider, SystemClock, Task, TaskId, TaskMode, TaskPriority, TaskSource, TaskStatus};
use fleetops_engine::pipeline::EngineFactory;
use fleetops_engine::{PipelineDriver, Settings, TaskQueue, WarmPoolManager};
use fleetops_storage::TaskStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

/// A fully-wired task execution plane backed by fakes, plus the temp
/// directory its history file lives in (kept alive for the harness's
/// lifetime).
pub struct Harness {
    pub queue: TaskQueue,
    pub pool: Arc<WarmPoolManager>,
    pub backend: Arc<FakeSandboxBackend>,
    pub source: Arc<FakeSourceProvider>,
    _dir: tempfile::TempDir,
}

impl Harness {
    /// Build a harness with a fresh, unscripted `FakeAgentEngine` per task
    /// (every prompt defaults to success) and the given pool size.
    pub fn new(warm_pool_size: usize) -> Self {
        Self::with_engine_factory(warm_pool_size, default_engine_factory())
    }

    pub fn with_engine_factory(warm_pool_size: usize, engine_factory: EngineFactory) -> Self {
        let backend = FakeSandboxBackend::new();
        let pool = WarmPoolManager::new(Arc::clone(&backend) as _, SandboxSpec::default(), warm_pool_size, 1);
        let source = Arc::new(FakeSourceProvider::new());
        let settings = Arc::new(Settings::default());
        let runner = Arc::new(fleetops_engine::AgentRunner::new(Arc::clone(&settings), None));
        let driver = PipelineDriver::new(
            Arc::clone(&pool),
            Arc::clone(&backend) as _,
            Arc::clone(&source) as _,
            runner,
            settings,
            engine_factory,
            None,
        );

        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(TaskStore::load(dir.path().join("history.json")));
        let queue = TaskQueue::new(driver, store, warm_pool_size.max(1));

        Self {
            queue,
            pool,
            backend,
            source,
            _dir: dir,
        }
    }

    pub async fn start(&self) {
        self.pool.start().await;
        self.queue.start();
    }

    pub async fn shutdown(&self) {
        self.queue.stop().await;
        self.pool.stop().await;
    }

    /// Poll until `id` reaches a terminal status, or panic after
    /// `SPEC_WAIT_MAX_MS`.
    pub async fn wait_for_terminal(&self, id: &TaskId) -> Task {
        let attempts = SPEC_WAIT_MAX_MS / SPEC_POLL_INTERVAL_MS;
        for _ in 0..attempts {
            if let Some(task) = self.queue.get(id).await {
                if task.status.is_terminal() {
                    return task;
                }
            }
            tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
        }
        panic!("task {id} did not reach a terminal status within {SPEC_WAIT_MAX_MS}ms");
    }

    /// Poll until `id`'s status equals `status`, or panic after
    /// `SPEC_WAIT_MAX_MS`.
    pub async fn wait_for_status(&self, id: &TaskId, status: TaskStatus) {
        let attempts = SPEC_WAIT_MAX_MS / SPEC_POLL_INTERVAL_MS;
        for _ in 0..attempts {
            if let Some(task) = self.queue.get(id).await {
                if task.status == status {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
        }
        panic!("task {id} never reached status {status:?} within {SPEC_WAIT_MAX_MS}ms");
    }
}

fn default_engine_factory() -> EngineFactory {
    Arc::new(|| Ok(Box::new(FakeAgentEngine::new("fake")) as Box<dyn AgentEngine>))
}

/// Adapts a shared, pre-scripted `Arc<FakeAgentEngine>` to the trait the
/// pipeline driver expects (`start`/`stop` need `&mut self`, which a
/// shared `Arc` can't offer).
pub struct SharedFakeEngine(pub Arc<FakeAgentEngine>);

#[async_trait::async_trait]
impl AgentEngine for SharedFakeEngine {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn start(&mut self, _sandbox: &fleetops_core::Sandbox, _backend: &dyn fleetops_adapters::SandboxBackend) -> Result<(), fleetops_adapters::AdapterError> {
        Ok(())
    }

    async fn execute_prompt(
        &self,
        sandbox: &fleetops_core::Sandbox,
        backend: &dyn fleetops_adapters::SandboxBackend,
        prompt: &str,
        timeout: Duration,
    ) -> Result<(bool, String), fleetops_adapters::AdapterError> {
        self.0.execute_prompt(sandbox, backend, prompt, timeout).await
    }

    async fn stop(&mut self, _sandbox: &fleetops_core::Sandbox, _backend: &dyn fleetops_adapters::SandboxBackend) -> Result<(), fleetops_adapters::AdapterError> {
        Ok(())
    }
}

/// Wraps a factory that always hands out the same pre-scripted engine, for
/// scenarios that need to control analyze/plan/code/repair responses.
pub fn single_engine_factory(engine: Arc<FakeAgentEngine>) -> EngineFactory {
    Arc::new(move || {
        let engine = Arc::clone(&engine);
        Ok(Box::new(SharedFakeEngine(engine)) as Box<dyn AgentEngine>)
    })
}

/// A task builder with sane defaults, overridable field by field.
pub fn task(mode: TaskMode, description: &str) -> Task {
    let n = NEXT_TASK_ID.fetch_add(1, Ordering::SeqCst);
    Task::new(
        TaskId::new(format!("spec-task-{n}")),
        description,
        "https://github.com/acme/widgets.git",
        "main",
        GitProvider::GitHub,
        TaskPriority::Medium,
        mode,
        TaskSource::Api,
        5,
        30,
        &SystemClock,
    )
}
