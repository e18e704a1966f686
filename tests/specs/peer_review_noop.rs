//! Scenario 6: peer review with an empty diff (base == target).

use crate::prelude::*;
use fleetops_core::{TaskMode, TaskStatus};

#[tokio::test]
async fn peer_review_with_no_differences_succeeds_with_a_no_op_summary() {
    let harness = Harness::new(1);
    harness.start().await;

    let mut submitted = task(TaskMode::PeerReview, "Peer review a branch against itself");
    submitted.target_branch = Some(submitted.base_branch.clone());
    let id = harness.queue.submit(submitted).await;

    let finished = harness.wait_for_terminal(&id).await;

    assert_eq!(finished.status, TaskStatus::Completed);
    assert!(finished.pr_url.is_none());
    let review = finished.review_output.expect("peer review should have produced a summary");
    assert!(review.contains("No differences"));

    harness.shutdown().await;
}
