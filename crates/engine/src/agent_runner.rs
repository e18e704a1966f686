// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent runner (C5): drives a coding agent through the deterministic and
//! creative steps of a task, bounded by a lint/test/repair loop.

use fleetops_adapters::{AgentEngine, SandboxBackend};
use fleetops_core::{redact_url, AgentRunResult, Sandbox, StepKind, StepResult};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::settings::Settings;

/// Caps applied when truncating file content for creative review steps.
const FILE_REVIEW_MAX_LINES: usize = 300;
const FILE_REVIEW_MAX_CHARS: usize = 3000;
/// Hard cap on how many of the selected top files get a per-file creative
/// review, independent of `review_max_files`: bounds LLM context regardless
/// of how generous the configured file-selection cap is.
const FILE_REVIEW_HARD_CAP: usize = 15;
const PEER_REVIEW_DIFF_EMPTY_MESSAGE: &str = "No differences found between the two refs.";

pub type StepNotify = std::sync::Arc<dyn Fn(&StepResult) + Send + Sync>;

pub struct AgentRunner {
    settings: std::sync::Arc<Settings>,
    step_notify: Option<StepNotify>,
}

impl AgentRunner {
    pub fn new(settings: std::sync::Arc<Settings>, step_notify: Option<StepNotify>) -> Self {
        Self {
            settings,
            step_notify,
        }
    }

    fn notify(&self, step: &StepResult) {
        if let Some(notify) = &self.step_notify {
            notify(step);
        }
    }

    async fn exec_step(
        &self,
        backend: &dyn SandboxBackend,
        sandbox: &Sandbox,
        kind: StepKind,
        command: &str,
        timeout: Duration,
        ignore_exit_code: bool,
    ) -> StepResult {
        let started = Instant::now();
        let output = backend.exec(sandbox, command, timeout).await;
        let success = ignore_exit_code || output.success();
        let text = if output.stderr.is_empty() {
            output.stdout
        } else {
            format!("{}\n{}", output.stdout, output.stderr)
        };
        let step = StepResult::new(kind, success, text, started.elapsed().as_millis() as u64);
        self.notify(&step);
        step
    }

    async fn prompt_step(
        &self,
        engine: &dyn AgentEngine,
        sandbox: &Sandbox,
        backend: &dyn SandboxBackend,
        kind: StepKind,
        prompt: &str,
        timeout: Duration,
        force_success: bool,
    ) -> Result<StepResult, fleetops_adapters::AdapterError> {
        let started = Instant::now();
        let (engine_success, output) = engine.execute_prompt(sandbox, backend, prompt, timeout).await?;
        let success = force_success || engine_success;
        let step = StepResult::new(kind, success, output, started.elapsed().as_millis() as u64);
        self.notify(&step);
        Ok(step)
    }

    /// The 8-step (or more, with repair iterations) code-change pipeline:
    /// setup, analyze, plan, code, lint, test, a bounded repair loop, commit.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_code(
        &self,
        engine: &dyn AgentEngine,
        sandbox: &Sandbox,
        backend: &dyn SandboxBackend,
        description: &str,
        max_iterations: u32,
        timeout: Duration,
        clone_url: &str,
        credentials: &HashMap<String, String>,
        base_branch: &str,
        working_branch: &str,
    ) -> Result<AgentRunResult, fleetops_adapters::AdapterError> {
        let mut steps = Vec::new();

        tracing::debug!(url = %redact_url(clone_url), branch = base_branch, "cloning repository for code task");
        let authed_url = authenticated_clone_url(clone_url, credentials);
        let setup_cmd = format!(
            "git clone --depth 1 --branch '{base_branch}' '{authed_url}' . && git checkout -b '{working_branch}' && (make setup || npm install || true)"
        );
        let setup = self.exec_step(backend, sandbox, StepKind::Setup, &setup_cmd, timeout, true).await;
        steps.push(setup);

        let analyze = self
            .prompt_step(
                engine,
                sandbox,
                backend,
                StepKind::Analyze,
                &format!("Analyze the repository to plan: {description}"),
                timeout,
                true,
            )
            .await?;
        steps.push(analyze);

        let plan = self
            .prompt_step(
                engine,
                sandbox,
                backend,
                StepKind::Plan,
                &format!("Produce a concrete implementation plan for: {description}"),
                timeout,
                true,
            )
            .await?;
        steps.push(plan);

        let code = self
            .prompt_step(
                engine,
                sandbox,
                backend,
                StepKind::Code,
                &format!("Implement the following change: {description}"),
                timeout,
                false,
            )
            .await?;
        let code_succeeded = code.success;
        steps.push(code);

        if !code_succeeded {
            return Ok(AgentRunResult::failed(steps, 0));
        }

        let mut lint = self.exec_step(backend, sandbox, StepKind::Lint, "make lint", timeout, false).await;
        steps.push(lint.clone());
        let mut test = self.exec_step(backend, sandbox, StepKind::Test, "make test", timeout, false).await;
        steps.push(test.clone());

        let mut iterations_used = 0;
        let mut repaired = lint.success && test.success;
        if !repaired {
            for iteration in 1..=max_iterations {
                iterations_used = iteration;
                let repair_prompt = format!(
                    "Lint output:\n{}\n\nTest output:\n{}\n\nFix the failures above.",
                    lint.output, test.output
                );
                let repair = self
                    .prompt_step(engine, sandbox, backend, StepKind::Repair, &repair_prompt, timeout, true)
                    .await?;
                steps.push(repair);

                lint = self.exec_step(backend, sandbox, StepKind::Lint, "make lint", timeout, false).await;
                steps.push(lint.clone());
                test = self.exec_step(backend, sandbox, StepKind::Test, "make test", timeout, false).await;
                steps.push(test.clone());

                if lint.success && test.success {
                    repaired = true;
                    break;
                }
            }
        }

        if !repaired {
            // Repair loop exhausted without a passing lint/test pair.
            return Ok(AgentRunResult::failed(steps, iterations_used));
        }

        let commit_message = format!(
            "fleetops: {}\n\nAgent: {}",
            truncate_chars(description, 72),
            engine.name()
        );
        let commit = self
            .exec_step(
                backend,
                sandbox,
                StepKind::Commit,
                &format!(
                    "git add -A && git commit -m '{}' && git push '{authed_url}' 'HEAD:{working_branch}'",
                    commit_message.replace('\'', "'\\''")
                ),
                timeout,
                false,
            )
            .await;
        let commit_succeeded = commit.success;
        steps.push(commit);

        Ok(AgentRunResult {
            success: commit_succeeded,
            steps,
            iterations_used,
            files_changed: Vec::new(),
            summary: None,
        })
    }

    /// The 9-step review pipeline: setup, inventory, deps, metrics,
    /// security, per-file review (capped), synthesis, report, git stats.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_review(
        &self,
        engine: &dyn AgentEngine,
        sandbox: &Sandbox,
        backend: &dyn SandboxBackend,
        description: &str,
        timeout: Duration,
        clone_url: &str,
        credentials: &HashMap<String, String>,
        branch: &str,
    ) -> Result<AgentRunResult, fleetops_adapters::AdapterError> {
        let mut steps = Vec::new();

        tracing::debug!(url = %redact_url(clone_url), branch, "cloning repository for review task");
        let authed_url = authenticated_clone_url(clone_url, credentials);
        let setup_cmd = format!("git clone --depth 1 --branch '{branch}' '{authed_url}' . && (make setup || true)");
        steps.push(self.exec_step(backend, sandbox, StepKind::Setup, &setup_cmd, timeout, true).await);

        let inventory = self
            .exec_step(backend, sandbox, StepKind::Inventory, "git ls-files", timeout, true)
            .await;
        let file_list: Vec<String> = inventory
            .output
            .lines()
            .filter(|line| !self.is_skipped(line))
            .take(self.settings.review_max_files)
            .map(str::to_string)
            .collect();
        steps.push(inventory);

        steps.push(
            self.exec_step(backend, sandbox, StepKind::Deps, "cat package.json Cargo.toml 2>/dev/null || true", timeout, true)
                .await,
        );
        steps.push(self.exec_step(backend, sandbox, StepKind::Metrics, "scc . || true", timeout, true).await);
        steps.push(self.exec_step(backend, sandbox, StepKind::Security, "ast-grep scan . || true", timeout, true).await);

        for file in file_list.iter().take(FILE_REVIEW_HARD_CAP) {
            let cat_cmd = format!("head -c {FILE_REVIEW_MAX_CHARS} '{file}' | head -n {FILE_REVIEW_MAX_LINES}");
            let contents = self.exec_step(backend, sandbox, StepKind::FileReview, &cat_cmd, timeout, true).await;
            let review_prompt = format!("Review this file for issues ({file}):\n{}", contents.output);
            let review = self
                .prompt_step(engine, sandbox, backend, StepKind::FileReview, &review_prompt, timeout, true)
                .await?;
            steps.push(review);
        }

        let synthesis = self
            .prompt_step(
                engine,
                sandbox,
                backend,
                StepKind::Synthesis,
                "Synthesize the per-file findings into a cross-file summary.",
                timeout,
                true,
            )
            .await?;
        steps.push(synthesis);

        let report = self
            .prompt_step(
                engine,
                sandbox,
                backend,
                StepKind::Report,
                &format!("Write the final review report for: {description}"),
                timeout,
                false,
            )
            .await?;
        let report_success = report.success;
        let report_output = report.output.clone();
        steps.push(report);

        steps.push(self.exec_step(backend, sandbox, StepKind::GitStats, "git log --stat -5", timeout, true).await);

        Ok(AgentRunResult {
            success: report_success,
            steps,
            iterations_used: 0,
            files_changed: file_list,
            summary: Some(report_output),
        })
    }

    /// The 4-step peer-review pipeline: setup, diff, peer review, feedback.
    /// Exits early after the diff step if there are no differences.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_peer_review(
        &self,
        engine: &dyn AgentEngine,
        sandbox: &Sandbox,
        backend: &dyn SandboxBackend,
        base: &str,
        target: &str,
        timeout: Duration,
        clone_url: &str,
        credentials: &HashMap<String, String>,
    ) -> Result<AgentRunResult, fleetops_adapters::AdapterError> {
        let mut steps = Vec::new();
        tracing::debug!(url = %redact_url(clone_url), base, target, "cloning repository for peer review task");
        let authed_url = authenticated_clone_url(clone_url, credentials);
        let setup_cmd = format!(
            "git clone --no-single-branch --branch '{base}' '{authed_url}' . && git fetch origin '{target}:{target}' && (make setup || true)"
        );
        steps.push(self.exec_step(backend, sandbox, StepKind::Setup, &setup_cmd, timeout, true).await);

        let diff_cmd = format!("git diff '{base}'..'{target}' | head -c {}", self.settings.peer_review_diff_char_cap);
        let diff = self.exec_step(backend, sandbox, StepKind::Diff, &diff_cmd, timeout, true).await;
        let diff_text = diff.output.clone();
        steps.push(diff);

        if diff_text.trim().is_empty() {
            return Ok(AgentRunResult {
                success: true,
                steps,
                iterations_used: 0,
                files_changed: Vec::new(),
                summary: Some(PEER_REVIEW_DIFF_EMPTY_MESSAGE.to_string()),
            });
        }

        let peer_review = self
            .prompt_step(
                engine,
                sandbox,
                backend,
                StepKind::PeerReview,
                &format!("Review this diff between {base} and {target}:\n{diff_text}"),
                timeout,
                false,
            )
            .await?;
        let peer_review_success = peer_review.success;
        let peer_review_output = peer_review.output.clone();
        steps.push(peer_review);

        let feedback = self
            .prompt_step(
                engine,
                sandbox,
                backend,
                StepKind::PeerFeedback,
                &format!("Summarize actionable feedback from this review:\n{peer_review_output}"),
                timeout,
                true,
            )
            .await?;
        let feedback_output = feedback.output.clone();
        steps.push(feedback);

        Ok(AgentRunResult {
            success: peer_review_success,
            steps,
            iterations_used: 0,
            files_changed: Vec::new(),
            summary: Some(feedback_output),
        })
    }

    fn is_skipped(&self, path: &str) -> bool {
        self.settings
            .review_skip_patterns
            .iter()
            .any(|pattern| glob_match(pattern, path))
    }
}

/// Embeds `username`/`password` from a credentials map into a clone URL's
/// userinfo component. Callers must only pass the result to `backend.exec`,
/// never to `tracing`/`StepResult` — log `redact_url(clone_url)` instead.
fn authenticated_clone_url(clone_url: &str, credentials: &HashMap<String, String>) -> String {
    let user = credentials.get("username").map(String::as_str).unwrap_or("");
    let pass = credentials.get("password").map(String::as_str).unwrap_or("");
    match clone_url.split_once("://") {
        Some((scheme, rest)) => format!("{scheme}://{user}:{pass}@{rest}"),
        None => clone_url.to_string(),
    }
}

/// Minimal `*`-only glob matcher, sufficient for the skip-pattern list
/// (`*.lock`, `node_modules/*`, ...) without pulling in a glob crate for
/// one call site.
fn glob_match(pattern: &str, text: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == text,
        Some((prefix, suffix)) => text.starts_with(prefix) && text.ends_with(suffix),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{truncated}\u{2026}")
    }
}

#[cfg(test)]
#[path = "agent_runner_tests.rs"]
mod tests;
