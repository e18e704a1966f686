// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration, read once at startup and passed by value into
//! every component constructor. Never re-read mid-process: components
//! that need a knob get their own `Arc<Settings>` clone, not a live
//! pointer back into the environment.

use fleetops_core::SandboxBackendKind;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub warm_pool_size: usize,
    pub warm_pool_refill_threshold: usize,
    pub max_concurrent_tasks: usize,
    pub default_task_timeout: Duration,
    pub default_max_iterations: u32,
    pub sandbox_backend: SandboxBackendKind,
    pub sandbox_memory_mb: u32,
    pub sandbox_vcpus: u32,
    pub agent_engine_name: String,
    pub review_max_files: usize,
    pub review_skip_patterns: Vec<String>,
    pub review_ast_grep_rules: Vec<String>,
    pub peer_review_diff_char_cap: usize,
    pub task_history_path: std::path::PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            warm_pool_size: 5,
            warm_pool_refill_threshold: 2,
            max_concurrent_tasks: 5,
            default_task_timeout: Duration::from_secs(1800),
            default_max_iterations: 5,
            sandbox_backend: SandboxBackendKind::Container,
            sandbox_memory_mb: 2048,
            sandbox_vcpus: 2,
            agent_engine_name: "claude".to_string(),
            review_max_files: 25,
            review_skip_patterns: vec![
                "*.lock".to_string(),
                "*.min.js".to_string(),
                "node_modules/*".to_string(),
                "target/*".to_string(),
            ],
            review_ast_grep_rules: Vec::new(),
            peer_review_diff_char_cap: 15_000,
            task_history_path: std::path::PathBuf::from("fleetops-task-history.json"),
        }
    }
}

impl Settings {
    /// Build settings from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            warm_pool_size: env_usize("FLEETOPS_WARM_POOL_SIZE", defaults.warm_pool_size),
            warm_pool_refill_threshold: env_usize(
                "FLEETOPS_WARM_POOL_REFILL_THRESHOLD",
                defaults.warm_pool_refill_threshold,
            ),
            max_concurrent_tasks: env_usize(
                "FLEETOPS_MAX_CONCURRENT_TASKS",
                defaults.max_concurrent_tasks,
            ),
            default_task_timeout: Duration::from_secs(env_u64(
                "FLEETOPS_DEFAULT_TASK_TIMEOUT_SECONDS",
                defaults.default_task_timeout.as_secs(),
            )),
            default_max_iterations: env_u64(
                "FLEETOPS_DEFAULT_MAX_ITERATIONS",
                defaults.default_max_iterations as u64,
            ) as u32,
            agent_engine_name: std::env::var("FLEETOPS_AGENT_BACKEND")
                .unwrap_or(defaults.agent_engine_name),
            review_max_files: env_usize("FLEETOPS_REVIEW_MAX_FILES", defaults.review_max_files),
            review_skip_patterns: env_string_list(
                "FLEETOPS_REVIEW_SKIP_PATTERNS",
                defaults.review_skip_patterns,
            ),
            ..defaults
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a comma-separated env var into a list, falling back to `default`
/// when unset or empty.
fn env_string_list(key: &str, default: Vec<String>) -> Vec<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => {
            v.split(',').map(|s| s.trim().to_string()).collect()
        }
        _ => default,
    }
}
