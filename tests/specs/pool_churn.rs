//! Scenario 5: pool churn across many sequential tasks with a tiny pool.

use crate::prelude::*;
use fleetops_core::{TaskMode, TaskStatus};

#[tokio::test]
async fn twenty_sequential_tasks_against_a_single_sandbox_pool() {
    let harness = Harness::new(1);
    harness.start().await;

    let mut ids = Vec::new();
    for n in 0..20 {
        let id = harness.queue.submit(task(TaskMode::Code, &format!("Automated change number {n}"))).await;
        let finished = harness.wait_for_terminal(&id).await;
        assert_eq!(finished.status, TaskStatus::Completed);
        ids.push(id);
    }
    assert_eq!(ids.len(), 20);

    let stats = harness.pool.stats().await;
    assert!(stats.total <= 1, "pool should never grow beyond its configured size of 1");

    harness.shutdown().await;

    // Every sandbox created to serve the 20 tasks, plus whatever was still
    // in the pool at shutdown, ends up destroyed.
    assert!(harness.backend.destroyed_ids().len() >= 20);
}
