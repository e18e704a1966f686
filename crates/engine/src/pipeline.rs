// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline driver (C4): the per-task lifecycle — claim a sandbox, run the
//! agent, open a pull request or file a review, release the sandbox.

use fleetops_adapters::{AgentEngine, SandboxBackend, SourceProvider};
use fleetops_core::{Clock, Sandbox, SystemClock, Task, TaskId, TaskMode, TaskStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::agent_runner::AgentRunner;
use crate::pool::WarmPoolManager;
use crate::settings::Settings;
use crate::EngineError;

pub type StatusNotify = Arc<dyn Fn(&Task) + Send + Sync>;
/// Builds a fresh engine per task. A plain function pointer suffices for
/// `build_engine`; tests swap in a closure that hands out a `FakeAgentEngine`.
pub type EngineFactory =
    Arc<dyn Fn() -> Result<Box<dyn AgentEngine>, fleetops_adapters::AdapterError> + Send + Sync>;

pub struct PipelineDriver {
    pool: Arc<WarmPoolManager>,
    backend: Arc<dyn SandboxBackend>,
    source: Arc<dyn SourceProvider>,
    runner: Arc<AgentRunner>,
    settings: Arc<Settings>,
    engine_factory: EngineFactory,
    status_notify: Option<StatusNotify>,
}

/// Guarantees the claimed sandbox is released exactly once, even if
/// `execute` is aborted mid-flight (e.g. by [`crate::queue::TaskQueue::cancel`]).
/// Release itself is async, so an armed guard schedules it via `tokio::spawn`
/// rather than awaiting in `drop`.
struct ReleaseGuard {
    pool: Arc<WarmPoolManager>,
    task_id: TaskId,
    armed: bool,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if self.armed {
            let pool = Arc::clone(&self.pool);
            let task_id = self.task_id.clone();
            tokio::spawn(async move {
                pool.release(&task_id).await;
            });
        }
    }
}

impl PipelineDriver {
    pub fn new(
        pool: Arc<WarmPoolManager>,
        backend: Arc<dyn SandboxBackend>,
        source: Arc<dyn SourceProvider>,
        runner: Arc<AgentRunner>,
        settings: Arc<Settings>,
        engine_factory: EngineFactory,
        status_notify: Option<StatusNotify>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool,
            backend,
            source,
            runner,
            settings,
            engine_factory,
            status_notify,
        })
    }

    /// Build a driver wired to the real `claude`/`goose`/`opencode` engine
    /// factory, selecting by name from `settings.agent_engine_name`.
    pub fn with_default_engine(
        pool: Arc<WarmPoolManager>,
        backend: Arc<dyn SandboxBackend>,
        source: Arc<dyn SourceProvider>,
        runner: Arc<AgentRunner>,
        settings: Arc<Settings>,
        status_notify: Option<StatusNotify>,
    ) -> Arc<Self> {
        let name = settings.agent_engine_name.clone();
        let engine_factory: EngineFactory = Arc::new(move || fleetops_adapters::build_engine(&name));
        Self::new(pool, backend, source, runner, settings, engine_factory, status_notify)
    }

    fn notify(&self, task: &Task) {
        if let Some(notify) = &self.status_notify {
            notify(task);
        }
    }

    async fn set_status(&self, task_arc: &Arc<Mutex<Task>>, status: TaskStatus) {
        let mut task = task_arc.lock().await;
        task.status = status;
        task.updated_at_ms = SystemClock.epoch_ms();
        self.notify(&task);
    }

    async fn fail(&self, task_arc: &Arc<Mutex<Task>>, message: impl Into<String>) {
        let mut task = task_arc.lock().await;
        task.mark_failed(message, &SystemClock);
        self.notify(&task);
    }

    /// Run a task to completion. Always leaves the task in a terminal
    /// status; never panics or propagates an error to the caller, since the
    /// dispatch loop has nothing to do with one beyond reaping the task.
    pub async fn execute(self: Arc<Self>, task_arc: Arc<Mutex<Task>>) {
        let timeout = {
            let task = task_arc.lock().await;
            Duration::from_secs(task.timeout_seconds)
        };

        let driver = Arc::clone(&self);
        let ran = tokio::time::timeout(timeout, driver.run(&task_arc)).await;

        if ran.is_err() {
            let already_terminal = task_arc.lock().await.status.is_terminal();
            if !already_terminal {
                self.fail(&task_arc, format!("task timed out after {timeout:?}")).await;
            }
        }
    }

    async fn run(&self, task_arc: &Arc<Mutex<Task>>) {
        let task_id = task_arc.lock().await.id.clone();

        self.set_status(task_arc, TaskStatus::ClaimingVm).await;

        let sandbox = match self.pool.claim(task_id.clone()).await {
            Ok(sandbox) => sandbox,
            Err(e) => {
                self.fail(task_arc, format!("failed to claim sandbox: {e}")).await;
                return;
            }
        };
        let mut guard = ReleaseGuard {
            pool: Arc::clone(&self.pool),
            task_id: task_id.clone(),
            armed: true,
        };

        {
            let mut task = task_arc.lock().await;
            task.sandbox_id = Some(sandbox.id.clone());
        }

        self.set_status(task_arc, TaskStatus::Running).await;

        let mode = task_arc.lock().await.mode;
        let outcome = match mode {
            TaskMode::Code => self.execute_code(task_arc, &sandbox).await,
            TaskMode::Review => self.execute_review(task_arc, &sandbox).await,
            TaskMode::PeerReview => self.execute_peer_review(task_arc, &sandbox).await,
        };

        if let Err(e) = outcome {
            self.fail(task_arc, e.to_string()).await;
        }

        self.pool.release(&task_id).await;
        guard.armed = false;
    }

    async fn execute_code(&self, task_arc: &Arc<Mutex<Task>>, sandbox: &Sandbox) -> Result<(), EngineError> {
        let (description, repo_url, base_branch, max_iterations, labels) = {
            let task = task_arc.lock().await;
            (
                task.description.clone(),
                task.repo_url.clone(),
                task.base_branch.clone(),
                task.max_iterations,
                task.labels.clone(),
            )
        };
        let repo_ref = fleetops_core::parse_repo_url(&repo_url)?;
        let working_branch = format!("fleetops/{}", task_arc.lock().await.id);

        self.source
            .create_branch(&repo_ref.owner, &repo_ref.repo, &working_branch, &base_branch)
            .await?;
        {
            let mut task = task_arc.lock().await;
            task.working_branch = Some(working_branch.clone());
        }

        let clone_url = self.source.get_clone_url(&repo_ref.owner, &repo_ref.repo);
        let credentials = self.source.get_credentials().await;

        let mut engine = (self.engine_factory)()?;
        engine.start(sandbox, self.backend.as_ref()).await?;

        let result = self
            .runner
            .run_code(
                engine.as_ref(),
                sandbox,
                self.backend.as_ref(),
                &description,
                max_iterations,
                self.settings.default_task_timeout,
                &clone_url,
                &credentials,
                &base_branch,
                &working_branch,
            )
            .await?;

        if result.success {
            self.set_status(task_arc, TaskStatus::CreatingPr).await;
            let title = generate_pr_title(&description);
            let body = format!(
                "Automated change opened by fleetops.\n\n{} step(s) run, {} iteration(s) used.",
                result.steps.len(),
                result.iterations_used
            );
            let pr = self
                .source
                .create_pull_request(&repo_ref.owner, &repo_ref.repo, &working_branch, &base_branch, &title, &body, &labels)
                .await?;

            let mut task = task_arc.lock().await;
            task.iterations_used = result.iterations_used;
            task.files_changed = result.files_changed.clone();
            task.mark_completed(pr.url, pr.number, &SystemClock);
            self.notify(&task);
        } else {
            let mut task = task_arc.lock().await;
            task.iterations_used = result.iterations_used;
            let message = if result.iterations_used > 0 {
                format!("Max repair iterations ({max_iterations}) exhausted")
            } else {
                "agent could not implement the requested change".to_string()
            };
            task.mark_failed(message, &SystemClock);
            self.notify(&task);
        }

        engine.stop(sandbox, self.backend.as_ref()).await?;
        Ok(())
    }

    async fn execute_review(&self, task_arc: &Arc<Mutex<Task>>, sandbox: &Sandbox) -> Result<(), EngineError> {
        let (description, repo_url, branch) = {
            let task = task_arc.lock().await;
            (task.description.clone(), task.repo_url.clone(), task.base_branch.clone())
        };
        let repo_ref = fleetops_core::parse_repo_url(&repo_url)?;
        let clone_url = self.source.get_clone_url(&repo_ref.owner, &repo_ref.repo);
        let credentials = self.source.get_credentials().await;

        let mut engine = (self.engine_factory)()?;
        engine.start(sandbox, self.backend.as_ref()).await?;

        let result = self
            .runner
            .run_review(
                engine.as_ref(),
                sandbox,
                self.backend.as_ref(),
                &description,
                self.settings.default_task_timeout,
                &clone_url,
                &credentials,
                &branch,
            )
            .await?;

        {
            let mut task = task_arc.lock().await;
            task.files_changed = result.files_changed.clone();
            let report = result.summary.clone().unwrap_or_default();
            if result.success {
                task.mark_review_completed(report, &SystemClock);
            } else {
                task.mark_failed("review pipeline did not complete successfully", &SystemClock);
            }
            self.notify(&task);
        }

        engine.stop(sandbox, self.backend.as_ref()).await?;
        Ok(())
    }

    async fn execute_peer_review(&self, task_arc: &Arc<Mutex<Task>>, sandbox: &Sandbox) -> Result<(), EngineError> {
        let (repo_url, base_branch, target_branch) = {
            let task = task_arc.lock().await;
            (task.repo_url.clone(), task.base_branch.clone(), task.target_branch.clone())
        };
        let target_branch = target_branch.ok_or(EngineError::MissingTargetBranch)?;
        let repo_ref = fleetops_core::parse_repo_url(&repo_url)?;
        let clone_url = self.source.get_clone_url(&repo_ref.owner, &repo_ref.repo);
        let credentials = self.source.get_credentials().await;

        let mut engine = (self.engine_factory)()?;
        engine.start(sandbox, self.backend.as_ref()).await?;

        let result = self
            .runner
            .run_peer_review(
                engine.as_ref(),
                sandbox,
                self.backend.as_ref(),
                &base_branch,
                &target_branch,
                self.settings.default_task_timeout,
                &clone_url,
                &credentials,
            )
            .await?;

        {
            let mut task = task_arc.lock().await;
            let report = result.summary.clone().unwrap_or_default();
            if result.success {
                task.mark_review_completed(report, &SystemClock);
            } else {
                task.mark_failed("peer review did not complete successfully", &SystemClock);
            }
            self.notify(&task);
        }

        engine.stop(sandbox, self.backend.as_ref()).await?;
        Ok(())
    }
}

/// Derive a pull-request title from a task description: skip re-prefixing
/// descriptions that already read as an imperative commit subject, and cap
/// length at 72 characters (truncating to 69 plus an ellipsis).
fn generate_pr_title(description: &str) -> String {
    const MAX_LEN: usize = 72;
    const TRUNCATED_LEN: usize = 69;
    const IMPERATIVE_PREFIXES: &[&str] = &["fix", "add", "update", "refactor", "remove"];

    let trimmed = description.trim();
    let lower = trimmed.to_lowercase();
    let already_imperative = IMPERATIVE_PREFIXES.iter().any(|p| lower.starts_with(p));
    let title = if already_imperative {
        trimmed.to_string()
    } else {
        format!("fix: {trimmed}")
    };

    if title.chars().count() <= MAX_LEN {
        title
    } else {
        let truncated: String = title.chars().take(TRUNCATED_LEN).collect();
        format!("{truncated}\u{2026}")
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
