// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Process wiring for the task execution plane: builds the warm pool,
//! task queue and pipeline driver from [`Settings`] and real adapters, and
//! runs them to completion. No HTTP server, no WebSocket gateway, no CLI
//! argument parser — those are separate collaborators this workspace does
//! not ship.

use fleetops_adapters::sandbox::{ContainerBackend, SandboxSpec};
use fleetops_adapters::source_control::GitHubProvider;
use fleetops_adapters::SandboxBackend;
use fleetops_engine::pipeline::PipelineDriver;
use fleetops_engine::{AgentRunner, Settings, TaskQueue, WarmPoolManager};
use fleetops_storage::TaskStore;
use std::sync::Arc;

/// Everything the process needs to accept and run tasks.
pub struct App {
    pub queue: TaskQueue,
    pub pool: Arc<WarmPoolManager>,
}

impl App {
    /// Wrap an already-constructed queue and pool. `build` is the
    /// production path; tests that want fakes call this directly after
    /// wiring a [`TaskQueue`]/[`PipelineDriver`] themselves.
    pub fn new(queue: TaskQueue, pool: Arc<WarmPoolManager>) -> Self {
        Self { queue, pool }
    }

    /// Build the full stack from `settings`, talking to real Docker (via
    /// `bollard`) and a real GitHub token.
    pub async fn build(settings: Settings, github_token: String) -> Result<Self, fleetops_adapters::AdapterError> {
        let settings = Arc::new(settings);
        let backend: Arc<dyn SandboxBackend> = Arc::new(ContainerBackend::connect()?);
        let spec = SandboxSpec {
            memory_mb: settings.sandbox_memory_mb,
            vcpus: settings.sandbox_vcpus,
            ..SandboxSpec::default()
        };
        let pool = WarmPoolManager::new(Arc::clone(&backend), spec, settings.warm_pool_size, settings.warm_pool_refill_threshold);
        pool.start().await;

        let source = Arc::new(GitHubProvider::new(github_token)?);
        let runner = Arc::new(AgentRunner::new(Arc::clone(&settings), None));
        let driver = PipelineDriver::with_default_engine(
            Arc::clone(&pool),
            backend,
            source,
            runner,
            Arc::clone(&settings),
            None,
        );

        let store = Arc::new(TaskStore::load(settings.task_history_path.clone()));
        let queue = TaskQueue::new(driver, store, settings.max_concurrent_tasks);
        queue.start();

        Ok(Self::new(queue, pool))
    }

    pub async fn shutdown(&self) {
        self.queue.stop().await;
        self.pool.stop().await;
    }
}

pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
