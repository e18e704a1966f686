// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step-level results produced by the agent runner.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Every distinct unit of work the agent runner can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Setup,
    Analyze,
    Plan,
    Code,
    Lint,
    Test,
    Repair,
    Commit,
    Inventory,
    Deps,
    Metrics,
    Security,
    FileReview,
    Synthesis,
    Report,
    GitStats,
    Diff,
    PeerReview,
    PeerFeedback,
}

impl StepKind {
    /// Deterministic steps derive success from a shell exit code; creative
    /// steps report the engine's own best-effort success flag.
    pub fn is_deterministic(&self) -> bool {
        matches!(
            self,
            Self::Setup
                | Self::Lint
                | Self::Test
                | Self::Commit
                | Self::Inventory
                | Self::Deps
                | Self::Metrics
                | Self::Security
                | Self::GitStats
                | Self::Diff
        )
    }
}

/// The outcome of a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub kind: StepKind,
    pub success: bool,
    pub output: String,
    pub duration_ms: u64,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl StepResult {
    pub fn new(kind: StepKind, success: bool, output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            kind,
            success,
            output: output.into(),
            duration_ms,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// The full record of an agent run: every step plus the overall verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunResult {
    pub success: bool,
    pub steps: Vec<StepResult>,
    pub iterations_used: u32,
    pub files_changed: Vec<String>,
    pub summary: Option<String>,
}

impl AgentRunResult {
    pub fn failed(steps: Vec<StepResult>, iterations_used: u32) -> Self {
        Self {
            success: false,
            steps,
            iterations_used,
            files_changed: Vec::new(),
            summary: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_classification() {
        assert!(StepKind::Test.is_deterministic());
        assert!(StepKind::Lint.is_deterministic());
        assert!(!StepKind::Analyze.is_deterministic());
        assert!(!StepKind::Plan.is_deterministic());
        assert!(!StepKind::Repair.is_deterministic());
    }

    #[test]
    fn step_result_builder_attaches_metadata() {
        let step = StepResult::new(StepKind::Test, true, "42 passed", 1200)
            .with_metadata("passed", serde_json::json!(42));
        assert_eq!(step.metadata.get("passed"), Some(&serde_json::json!(42)));
    }
}
