// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task status, priority and execution-mode enums.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`crate::task::Task`].
///
/// Transition graph:
/// `Pending -> ClaimingVm -> Running -> {CreatingPr -> Completed | Completed
/// | Failed}`, with `Cancelled` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    ClaimingVm,
    Running,
    CreatingPr,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal statuses do not transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::ClaimingVm => "claiming_vm",
            Self::Running => "running",
            Self::CreatingPr => "creating_pr",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Submission priority. Ordered so that `Critical < High < Medium < Low`
/// when compared numerically (lower value dequeues first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// What kind of pipeline a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    /// Implement a change and open a pull request.
    Code,
    /// Produce a structured review report, no PR.
    Review,
    /// Diff-based review between two branches/refs.
    PeerReview,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::ClaimingVm.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::CreatingPr.is_terminal());
    }

    #[test]
    fn priority_ordering() {
        let mut ps = vec![
            TaskPriority::Low,
            TaskPriority::Critical,
            TaskPriority::Medium,
            TaskPriority::High,
        ];
        ps.sort();
        assert_eq!(
            ps,
            vec![
                TaskPriority::Critical,
                TaskPriority::High,
                TaskPriority::Medium,
                TaskPriority::Low,
            ]
        );
    }

    #[test]
    fn display_matches_wire_form() {
        assert_eq!(TaskStatus::ClaimingVm.to_string(), "claiming_vm");
        assert_eq!(TaskStatus::CreatingPr.to_string(), "creating_pr");
    }
}
