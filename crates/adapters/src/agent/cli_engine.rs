// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic CLI-driven agent engine. Claude Code, Goose, and OpenCode all
//! expose themselves as a single binary that takes a prompt on stdin (or
//! as an argument) and streams a response to stdout, so one implementation
//! covers all three by varying the binary name and invocation shape.

use async_trait::async_trait;
use fleetops_core::Sandbox;
use std::time::Duration;

use super::AgentEngine;
use crate::error::AdapterError;
use crate::sandbox::SandboxBackend;

pub struct CliAgentEngine {
    name: String,
    binary: String,
}

impl CliAgentEngine {
    pub fn new(name: impl Into<String>, binary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            binary: binary.into(),
        }
    }

    fn prompt_command(&self, prompt: &str) -> String {
        let escaped = prompt.replace('\'', "'\\''");
        format!("{} --print '{}'", self.binary, escaped)
    }
}

#[async_trait]
impl AgentEngine for CliAgentEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(
        &mut self,
        sandbox: &Sandbox,
        backend: &dyn SandboxBackend,
    ) -> Result<(), AdapterError> {
        let check = backend
            .exec(sandbox, &format!("command -v {}", self.binary), Duration::from_secs(10))
            .await;
        if !check.success() {
            return Err(AdapterError::EngineStart(format!(
                "{} binary not found in sandbox",
                self.binary
            )));
        }
        Ok(())
    }

    async fn execute_prompt(
        &self,
        sandbox: &Sandbox,
        backend: &dyn SandboxBackend,
        prompt: &str,
        timeout: Duration,
    ) -> Result<(bool, String), AdapterError> {
        let output = backend.exec(sandbox, &self.prompt_command(prompt), timeout).await;
        if output.exit_code == 124 {
            return Err(AdapterError::EnginePrompt(format!(
                "{} timed out after {:?}",
                self.name, timeout
            )));
        }
        Ok((output.success(), output.stdout))
    }

    async fn stop(&mut self, _sandbox: &Sandbox, _backend: &dyn SandboxBackend) -> Result<(), AdapterError> {
        Ok(())
    }
}
