// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent engine contract: the boundary to a concrete LLM-backed coding
//! agent CLI (Claude Code, Goose, OpenCode, ...).

pub mod cli_engine;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use fleetops_core::Sandbox;
use std::time::Duration;

use crate::error::AdapterError;
use crate::sandbox::SandboxBackend;

pub use cli_engine::CliAgentEngine;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAgentEngine;

/// A running or runnable coding agent bound to one sandbox for one task.
#[async_trait]
pub trait AgentEngine: Send + Sync {
    /// Short identifier used in commit trailers and logs, e.g. `"claude"`.
    fn name(&self) -> &str;

    /// Prepare the engine to receive prompts inside `sandbox`, using
    /// `backend` to exec any setup commands the engine itself needs.
    async fn start(
        &mut self,
        sandbox: &Sandbox,
        backend: &dyn SandboxBackend,
    ) -> Result<(), AdapterError>;

    /// Send a prompt and wait for the engine's free-text response.
    async fn execute_prompt(
        &self,
        sandbox: &Sandbox,
        backend: &dyn SandboxBackend,
        prompt: &str,
        timeout: Duration,
    ) -> Result<(bool, String), AdapterError>;

    /// Send a prompt and ask for a structured (JSON) response. Engines
    /// that don't support structured output fall back to free text and
    /// report `None` for the parsed value.
    async fn execute_prompt_structured(
        &self,
        sandbox: &Sandbox,
        backend: &dyn SandboxBackend,
        prompt: &str,
        timeout: Duration,
    ) -> Result<(bool, String, Option<serde_json::Value>), AdapterError> {
        let (success, output) = self.execute_prompt(sandbox, backend, prompt, timeout).await?;
        Ok((success, output, None))
    }

    async fn stop(&mut self, sandbox: &Sandbox, backend: &dyn SandboxBackend) -> Result<(), AdapterError>;
}

/// Build an engine by name. Engines are constructed lazily, one at a time,
/// so selecting `"claude"` never pulls in whatever an unused `"goose"`
/// engine would otherwise require.
pub fn build_engine(name: &str) -> Result<Box<dyn AgentEngine>, AdapterError> {
    match name {
        "claude" => Ok(Box::new(CliAgentEngine::new("claude", "claude"))),
        "goose" => Ok(Box::new(CliAgentEngine::new("goose", "goose"))),
        "opencode" => Ok(Box::new(CliAgentEngine::new("opencode", "opencode"))),
        other => Err(AdapterError::UnknownEngine(other.to_string())),
    }
}
