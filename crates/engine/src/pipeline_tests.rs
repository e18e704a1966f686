// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleetops_adapters::sandbox::SandboxSpec;
use fleetops_adapters::{AgentEngine, FakeAgentEngine, FakeSandboxBackend, FakeSourceProvider, SandboxBackend, SourceProvider};
use fleetops_core::{GitProvider, SystemClock, Task, TaskId, TaskMode, TaskPriority, TaskSource, TaskStatus};
use std::sync::Arc;
use tokio::sync::Mutex;

fn make_task(mode: TaskMode, timeout_seconds: u64) -> Task {
    let mut task = Task::new(
        TaskId::new("task-1"),
        "fix the thing",
        "https://github.com/acme/widgets.git",
        "main",
        GitProvider::GitHub,
        TaskPriority::Medium,
        mode,
        TaskSource::Api,
        3,
        timeout_seconds,
        &SystemClock,
    );
    if mode == TaskMode::PeerReview {
        task.target_branch = Some("feature/x".to_string());
    }
    task
}

/// Wraps a factory that always returns the same pre-scripted engine, for
/// tests that want to assert on what the engine saw.
fn single_engine_factory(engine: Arc<FakeAgentEngine>) -> EngineFactory {
    Arc::new(move || {
        let engine = Arc::clone(&engine);
        Ok(Box::new(SharedFakeEngine(engine)) as Box<dyn AgentEngine>)
    })
}

/// Adapts a shared `Arc<FakeAgentEngine>` (which can't implement `AgentEngine`
/// itself, since `start`/`stop` need `&mut self`) to the trait the pipeline
/// driver expects.
struct SharedFakeEngine(Arc<FakeAgentEngine>);

#[async_trait::async_trait]
impl AgentEngine for SharedFakeEngine {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn start(
        &mut self,
        _sandbox: &fleetops_core::Sandbox,
        _backend: &dyn SandboxBackend,
    ) -> Result<(), fleetops_adapters::AdapterError> {
        Ok(())
    }

    async fn execute_prompt(
        &self,
        sandbox: &fleetops_core::Sandbox,
        backend: &dyn SandboxBackend,
        prompt: &str,
        timeout: std::time::Duration,
    ) -> Result<(bool, String), fleetops_adapters::AdapterError> {
        self.0.execute_prompt(sandbox, backend, prompt, timeout).await
    }

    async fn stop(
        &mut self,
        _sandbox: &fleetops_core::Sandbox,
        _backend: &dyn SandboxBackend,
    ) -> Result<(), fleetops_adapters::AdapterError> {
        Ok(())
    }
}

fn default_engine_factory() -> EngineFactory {
    Arc::new(|| Ok(Box::new(FakeAgentEngine::new("fake")) as Box<dyn AgentEngine>))
}

fn make_driver(
    pool: Arc<WarmPoolManager>,
    backend: Arc<dyn SandboxBackend>,
    source: Arc<dyn SourceProvider>,
    engine_factory: EngineFactory,
) -> Arc<PipelineDriver> {
    let settings = Arc::new(Settings::default());
    let runner = Arc::new(AgentRunner::new(Arc::clone(&settings), None));
    PipelineDriver::new(pool, backend, source, runner, settings, engine_factory, None)
}

#[tokio::test]
async fn code_task_completes_and_opens_pr() {
    let backend = FakeSandboxBackend::new();
    let pool = WarmPoolManager::new(backend.clone(), SandboxSpec::default(), 1, 1);
    pool.start().await;
    let source = Arc::new(FakeSourceProvider::new());
    let driver = make_driver(Arc::clone(&pool), backend, source, default_engine_factory());

    let task = Arc::new(Mutex::new(make_task(TaskMode::Code, 30)));
    driver.execute(Arc::clone(&task)).await;

    let finished = task.lock().await.clone();
    assert_eq!(finished.status, TaskStatus::Completed);
    assert!(finished.pr_url.is_some());
    assert!(finished.working_branch.is_some());
    assert_eq!(pool.stats().await.total, 0);

    pool.stop().await;
}

#[tokio::test]
async fn review_task_completes_without_pr() {
    let backend = FakeSandboxBackend::new();
    let pool = WarmPoolManager::new(backend.clone(), SandboxSpec::default(), 1, 1);
    pool.start().await;
    let source = Arc::new(FakeSourceProvider::new());
    let driver = make_driver(Arc::clone(&pool), backend, source, default_engine_factory());

    let task = Arc::new(Mutex::new(make_task(TaskMode::Review, 30)));
    driver.execute(Arc::clone(&task)).await;

    let finished = task.lock().await.clone();
    assert_eq!(finished.status, TaskStatus::Completed);
    assert!(finished.pr_url.is_none());
    assert!(finished.review_output.is_some());

    pool.stop().await;
}

#[tokio::test]
async fn code_task_fails_when_code_step_fails() {
    let backend = FakeSandboxBackend::new();
    let pool = WarmPoolManager::new(backend.clone(), SandboxSpec::default(), 1, 1);
    pool.start().await;
    let source = Arc::new(FakeSourceProvider::new());

    let scripted = Arc::new(FakeAgentEngine::new("fake"));
    scripted.push_response(true, "analysis");
    scripted.push_response(true, "plan");
    scripted.push_response(false, "could not implement");
    let driver = make_driver(Arc::clone(&pool), backend, source, single_engine_factory(scripted));

    let task = Arc::new(Mutex::new(make_task(TaskMode::Code, 30)));
    driver.execute(Arc::clone(&task)).await;

    let finished = task.lock().await.clone();
    assert_eq!(finished.status, TaskStatus::Failed);
    assert!(finished.pr_url.is_none());

    pool.stop().await;
}

#[tokio::test]
async fn peer_review_without_target_branch_fails_cleanly() {
    let backend = FakeSandboxBackend::new();
    let pool = WarmPoolManager::new(backend.clone(), SandboxSpec::default(), 1, 1);
    pool.start().await;
    let source = Arc::new(FakeSourceProvider::new());
    let driver = make_driver(Arc::clone(&pool), backend, source, default_engine_factory());

    let mut task = make_task(TaskMode::PeerReview, 30);
    task.target_branch = None;
    let task = Arc::new(Mutex::new(task));
    driver.execute(Arc::clone(&task)).await;

    let finished = task.lock().await.clone();
    assert_eq!(finished.status, TaskStatus::Failed);
    assert!(finished.error_message.unwrap().contains("target branch"));
    assert_eq!(pool.stats().await.total, 0);

    pool.stop().await;
}

#[test]
fn pr_title_truncates_long_descriptions() {
    let long = "a".repeat(100);
    let title = generate_pr_title(&long);
    assert!(title.chars().count() <= 72);
    assert!(title.ends_with('\u{2026}'));
}

#[test]
fn pr_title_keeps_imperative_prefix_untouched() {
    let title = generate_pr_title("fix the broken retry logic");
    assert_eq!(title, "fix the broken retry logic");
}

#[test]
fn pr_title_prefixes_non_imperative_descriptions() {
    let title = generate_pr_title("the retry logic is broken");
    assert!(title.starts_with("fix: "));
}
