// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;

fn new_sandbox(clock: &FakeClock) -> Sandbox {
    Sandbox::new(
        SandboxId::new("sbx-1"),
        SandboxBackendKind::Container,
        512,
        1,
        clock,
    )
}

#[test]
fn new_sandbox_starts_creating() {
    let clock = FakeClock::new();
    let sbx = new_sandbox(&clock);
    assert_eq!(sbx.state, SandboxState::Creating);
    assert!(sbx.task_id.is_none());
    assert!(!sbx.is_ready());
}

#[test]
fn claim_binds_task_and_sets_timestamp() {
    let clock = FakeClock::new();
    let mut sbx = new_sandbox(&clock);
    sbx.state = SandboxState::Ready;
    clock.advance(std::time::Duration::from_millis(50));
    sbx.claim(TaskId::new("task-1"), &clock);
    assert_eq!(sbx.state, SandboxState::Claimed);
    assert_eq!(sbx.task_id, Some(TaskId::new("task-1")));
    assert!(sbx.claimed_at_ms.is_some());
}

#[test]
fn release_clears_task_and_moves_to_cleaning() {
    let clock = FakeClock::new();
    let mut sbx = new_sandbox(&clock);
    sbx.state = SandboxState::Ready;
    sbx.claim(TaskId::new("task-1"), &clock);
    sbx.release(&clock);
    assert_eq!(sbx.state, SandboxState::Cleaning);
    assert!(sbx.task_id.is_none());
    assert!(sbx.released_at_ms.is_some());
}

#[test]
fn error_state_is_terminal() {
    let state = SandboxState::Error {
        reason: "boom".into(),
    };
    assert!(state.is_terminal());
    assert!(SandboxState::Destroyed.is_terminal());
    assert!(!SandboxState::Ready.is_terminal());
}
