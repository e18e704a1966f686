//! Scenarios 3 and 4: the lint/test repair loop, success and exhaustion.

use crate::prelude::*;
use fleetops_adapters::FakeAgentEngine;
use fleetops_core::{TaskMode, TaskStatus};
use std::sync::Arc;

#[tokio::test]
async fn one_repair_round_recovers_a_failing_lint() {
    let engine = Arc::new(FakeAgentEngine::new("fake"));
    engine.push_response(true, "analysis");
    engine.push_response(true, "plan");
    engine.push_response(true, "implemented the fix");
    engine.push_response(true, "repaired the lint failure");

    let harness = Harness::with_engine_factory(1, single_engine_factory(Arc::clone(&engine)));
    harness.backend.push_exec_result(0, "", ""); // setup
    harness.backend.push_exec_result(1, "", "lint: 2 errors"); // initial lint, fails
    harness.backend.push_exec_result(1, "", "test: 1 failed"); // initial test, fails
    harness.backend.push_exec_result(0, "lint clean", ""); // post-repair lint, passes
    harness.backend.push_exec_result(0, "all tests passed", ""); // post-repair test, passes
    harness.start().await;

    let id = harness.queue.submit(task(TaskMode::Code, "Fix the lint failures in the parser module")).await;
    let finished = harness.wait_for_terminal(&id).await;

    assert_eq!(finished.status, TaskStatus::Completed);
    assert_eq!(finished.iterations_used, 1);

    harness.shutdown().await;
}

#[tokio::test]
async fn repair_budget_exhaustion_fails_with_the_expected_message() {
    let engine = Arc::new(FakeAgentEngine::new("fake"));
    engine.push_response(true, "analysis");
    engine.push_response(true, "plan");
    engine.push_response(true, "implemented the fix");
    for n in 1..=5 {
        engine.push_response(true, format!("repair attempt {n}"));
    }

    let harness = Harness::with_engine_factory(1, single_engine_factory(Arc::clone(&engine)));
    harness.backend.push_exec_result(0, "", ""); // setup
    // Every lint/test pair fails: initial + 5 repair rounds = 6 pairs.
    for _ in 0..6 {
        harness.backend.push_exec_result(1, "", "lint: still failing");
        harness.backend.push_exec_result(1, "", "test: still failing");
    }
    harness.start().await;

    let mut submitted = task(TaskMode::Code, "Fix a test that never passes");
    submitted.max_iterations = 5;
    let id = harness.queue.submit(submitted).await;
    let finished = harness.wait_for_terminal(&id).await;

    assert_eq!(finished.status, TaskStatus::Failed);
    assert_eq!(finished.iterations_used, 5);
    assert_eq!(finished.error_message.as_deref(), Some("Max repair iterations (5) exhausted"));

    harness.shutdown().await;
}
