use chrono::{Duration, Utc};

use relay_core::config::QueueConfig;
use relay_core::models::{ArtifactStatus, NewBulkArtifact};
use relay_storage::DurableQueue;

fn queue() -> DurableQueue {
    DurableQueue::open_in_memory(QueueConfig::default()).unwrap()
}

fn artifact(name: &str) -> NewBulkArtifact {
    NewBulkArtifact::new(format!("/data/{name}"), format!("site/2024-05-01/visual/{name}"))
}

#[tokio::test]
async fn priority_artifacts_jump_the_queue() {
    let q = queue();
    q.enqueue_artifact(artifact("a.jpg"), 10).await.unwrap();
    q.enqueue_artifact(artifact("b.jpg"), 10).await.unwrap();
    q.enqueue_artifact(artifact("urgent.jpg").with_priority(true), 10)
        .await
        .unwrap();

    let next = q.claim_artifact(Utc::now()).await.unwrap().unwrap();
    assert!(next.priority);
    assert_eq!(next.status, ArtifactStatus::InFlight);

    let next = q.claim_artifact(Utc::now()).await.unwrap().unwrap();
    assert!(next.destination_key.ends_with("a.jpg"));
}

#[tokio::test]
async fn completed_artifacts_leave_the_queue() {
    let q = queue();
    let inserted = q.enqueue_artifact(artifact("a.jpg"), 10).await.unwrap();
    let claimed = q.claim_artifact(Utc::now()).await.unwrap().unwrap();
    q.complete_artifact(claimed.id).await.unwrap();
    assert!(q.get_artifact(inserted.id).await.unwrap().is_none());
    assert!(q.claim_artifact(Utc::now()).await.unwrap().is_none());
}

#[tokio::test]
async fn failures_reschedule_then_mark_failed_at_cap() {
    let q = queue();
    let id = q.enqueue_artifact(artifact("a.jpg"), 10).await.unwrap().id;
    let mut now = Utc::now();

    for attempt in 1..=4 {
        let claimed = q.claim_artifact(now).await.unwrap();
        assert!(claimed.is_some(), "attempt {attempt} should be claimable");
        let status = q
            .artifact_failed(id, "503", false, 4, Duration::seconds(30), now)
            .await
            .unwrap();
        if attempt < 4 {
            assert_eq!(status, ArtifactStatus::Pending);
            assert!(q.claim_artifact(now).await.unwrap().is_none());
            now += Duration::seconds(31);
        } else {
            assert_eq!(status, ArtifactStatus::Failed);
        }
    }

    let failed = q.failed_artifacts(10).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].attempts, 4);
    assert_eq!(q.artifact_stats().await.unwrap().failed, 1);
}

#[tokio::test]
async fn full_queue_evicts_oldest_non_priority() {
    let q = queue();
    let first = q.enqueue_artifact(artifact("1.jpg"), 2).await.unwrap();
    q.enqueue_artifact(artifact("2.jpg"), 2).await.unwrap();
    let third = q.enqueue_artifact(artifact("3.jpg"), 2).await.unwrap();

    assert_eq!(third.evicted, Some(first.id));
    let evicted = q.get_artifact(first.id).await.unwrap().unwrap();
    assert_eq!(evicted.status, ArtifactStatus::Evicted);
}

#[tokio::test]
async fn full_queue_of_priority_items_rejects_normal_ones() {
    let q = queue();
    q.enqueue_artifact(artifact("p1.jpg").with_priority(true), 1)
        .await
        .unwrap();
    let err = q.enqueue_artifact(artifact("n.jpg"), 1).await.unwrap_err();
    assert!(err.to_string().contains("capacity exceeded"));

    // A priority item is still accepted.
    assert!(q
        .enqueue_artifact(artifact("p2.jpg").with_priority(true), 1)
        .await
        .is_ok());
}
