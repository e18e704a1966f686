//! Scenario 1: happy code path.

use crate::prelude::*;
use fleetops_core::{TaskMode, TaskStatus};

#[tokio::test]
async fn submitted_code_task_completes_and_opens_a_pr() {
    let harness = Harness::new(1);
    harness.start().await;

    let stats_before = harness.pool.stats().await;

    let id = harness
        .queue
        .submit(task(TaskMode::Code, "Fix the flaky test in the auth service module"))
        .await;

    let finished = harness.wait_for_terminal(&id).await;

    assert_eq!(finished.status, TaskStatus::Completed);
    assert!(finished.pr_url.is_some());
    assert!(finished.working_branch.is_some());

    // The sandbox claimed for this task was released and destroyed.
    let stats_after = harness.pool.stats().await;
    assert_eq!(stats_after.total, stats_before.total);
    assert!(!harness.backend.destroyed_ids().is_empty());

    harness.shutdown().await;
}
