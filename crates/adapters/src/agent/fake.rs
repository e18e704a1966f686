// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted agent engine for tests: returns pre-recorded responses
//! without ever shelling out.

use async_trait::async_trait;
use fleetops_core::Sandbox;
use parking_lot::Mutex;
use std::time::Duration;

use super::AgentEngine;
use crate::error::AdapterError;
use crate::sandbox::SandboxBackend;

#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub success: bool,
    pub output: String,
}

pub struct FakeAgentEngine {
    name: String,
    responses: Mutex<Vec<ScriptedResponse>>,
    prompts_seen: Mutex<Vec<String>>,
    fail_start: std::sync::atomic::AtomicBool,
}

impl FakeAgentEngine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(Vec::new()),
            prompts_seen: Mutex::new(Vec::new()),
            fail_start: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn push_response(&self, success: bool, output: impl Into<String>) {
        self.responses.lock().push(ScriptedResponse {
            success,
            output: output.into(),
        });
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn prompts_seen(&self) -> Vec<String> {
        self.prompts_seen.lock().clone()
    }
}

#[async_trait]
impl AgentEngine for FakeAgentEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self, _sandbox: &Sandbox, _backend: &dyn SandboxBackend) -> Result<(), AdapterError> {
        if self.fail_start.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AdapterError::EngineStart("injected failure".to_string()));
        }
        Ok(())
    }

    async fn execute_prompt(
        &self,
        _sandbox: &Sandbox,
        _backend: &dyn SandboxBackend,
        prompt: &str,
        _timeout: Duration,
    ) -> Result<(bool, String), AdapterError> {
        self.prompts_seen.lock().push(prompt.to_string());
        let mut responses = self.responses.lock();
        if responses.is_empty() {
            return Ok((true, String::new()));
        }
        let next = responses.remove(0);
        Ok((next.success, next.output))
    }

    async fn stop(&mut self, _sandbox: &Sandbox, _backend: &dyn SandboxBackend) -> Result<(), AdapterError> {
        Ok(())
    }
}
