// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Task` record: a unit of work submitted to the execution plane.

use crate::clock::Clock;
use crate::status::{TaskMode, TaskPriority, TaskStatus};
use crate::{SandboxId, TaskId};
use serde::{Deserialize, Serialize};

/// Where a task was submitted from. Stored as metadata only; no ingestion
/// surface for any of these sources ships in this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    Api,
    Slack,
    WebUi,
    Cli,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub repo_url: String,
    pub base_branch: String,
    pub target_branch: Option<String>,
    pub provider: crate::repo_url::GitProvider,
    pub priority: TaskPriority,
    pub mode: TaskMode,
    pub source: TaskSource,
    pub labels: Vec<String>,
    pub max_iterations: u32,
    pub timeout_seconds: u64,

    pub status: TaskStatus,
    pub sandbox_id: Option<SandboxId>,
    pub working_branch: Option<String>,
    pub pr_url: Option<String>,
    pub pr_number: Option<u64>,
    pub error_message: Option<String>,
    pub iterations_used: u32,
    pub files_changed: Vec<String>,
    pub test_results: Option<String>,
    pub review_output: Option<String>,
    pub agent_log: Vec<String>,

    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub completed_at_ms: Option<u64>,
    pub duration_seconds: Option<u64>,
}

impl Task {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TaskId,
        description: impl Into<String>,
        repo_url: impl Into<String>,
        base_branch: impl Into<String>,
        provider: crate::repo_url::GitProvider,
        priority: TaskPriority,
        mode: TaskMode,
        source: TaskSource,
        max_iterations: u32,
        timeout_seconds: u64,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.epoch_ms();
        Self {
            id,
            description: description.into(),
            repo_url: repo_url.into(),
            base_branch: base_branch.into(),
            target_branch: None,
            provider,
            priority,
            mode,
            source,
            labels: Vec::new(),
            max_iterations,
            timeout_seconds,
            status: TaskStatus::Pending,
            sandbox_id: None,
            working_branch: None,
            pr_url: None,
            pr_number: None,
            error_message: None,
            iterations_used: 0,
            files_changed: Vec::new(),
            test_results: None,
            review_output: None,
            agent_log: Vec::new(),
            created_at_ms: now,
            updated_at_ms: now,
            completed_at_ms: None,
            duration_seconds: None,
        }
    }

    fn finish(&mut self, status: TaskStatus, clock: &impl Clock) {
        let now = clock.epoch_ms();
        self.status = status;
        self.updated_at_ms = now;
        self.completed_at_ms = Some(now);
        self.duration_seconds = Some(now.saturating_sub(self.created_at_ms) / 1000);
    }

    /// Mark a code-mode task completed with an opened pull request.
    pub fn mark_completed(&mut self, pr_url: impl Into<String>, pr_number: u64, clock: &impl Clock) {
        self.pr_url = Some(pr_url.into());
        self.pr_number = Some(pr_number);
        self.finish(TaskStatus::Completed, clock);
    }

    /// Mark a review/peer-review task completed with a report, no PR.
    pub fn mark_review_completed(&mut self, review_output: impl Into<String>, clock: &impl Clock) {
        self.review_output = Some(review_output.into());
        self.finish(TaskStatus::Completed, clock);
    }

    pub fn mark_failed(&mut self, error_message: impl Into<String>, clock: &impl Clock) {
        self.error_message = Some(error_message.into());
        self.finish(TaskStatus::Failed, clock);
    }

    pub fn mark_cancelled(&mut self, clock: &impl Clock) {
        self.finish(TaskStatus::Cancelled, clock);
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
