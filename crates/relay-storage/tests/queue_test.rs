use chrono::{Duration, Utc};

use relay_core::config::QueueConfig;
use relay_core::models::{NewTelemetryRecord, Priority, RecordStatus, Topic};
use relay_storage::DurableQueue;

fn queue() -> DurableQueue {
    DurableQueue::open_in_memory(QueueConfig::default()).unwrap()
}

fn record(topic: Topic, body: &str, offset_secs: i64) -> NewTelemetryRecord {
    let mut r = NewTelemetryRecord::new(topic, body.as_bytes().to_vec());
    r.created_at = Utc::now() - Duration::seconds(1000) + Duration::seconds(offset_secs);
    r
}

#[tokio::test]
async fn enqueue_fetch_and_mark_sent() {
    let q = queue();
    let id = q.enqueue(record(Topic::Telemetry, "t1", 0)).await.unwrap();
    assert_eq!(q.count_pending().await.unwrap(), 1);

    let batch = q.fetch_pending(10).await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].id, id);
    assert_eq!(batch[0].payload, b"t1");
    assert_eq!(batch[0].status, RecordStatus::InFlight);

    q.mark_sent(id).await.unwrap();
    assert_eq!(q.count_pending().await.unwrap(), 0);
    assert_eq!(q.get(id).await.unwrap().unwrap().status, RecordStatus::Sent);
}

#[tokio::test]
async fn fetch_orders_oldest_first() {
    let q = queue();
    q.enqueue(record(Topic::Telemetry, "c", 30)).await.unwrap();
    q.enqueue(record(Topic::Telemetry, "a", 10)).await.unwrap();
    q.enqueue(record(Topic::Telemetry, "b", 20)).await.unwrap();

    let batch = q.fetch_pending(10).await.unwrap();
    let bodies: Vec<&[u8]> = batch.iter().map(|r| r.payload.as_slice()).collect();
    assert_eq!(bodies, vec![b"a".as_slice(), b"b", b"c"]);
}

#[tokio::test]
async fn alerts_drain_ahead_of_older_telemetry() {
    let q = queue();
    for i in 0..5 {
        q.enqueue(record(Topic::Telemetry, "telemetry", i)).await.unwrap();
    }
    for i in 0..3 {
        q.enqueue(record(Topic::Alerts, "alert", 100 + i)).await.unwrap();
    }

    let batch = q.fetch_pending(4).await.unwrap();
    assert_eq!(batch.len(), 4);
    assert!(batch[..3].iter().all(|r| r.priority == Priority::Alert));
    assert_eq!(batch[3].priority, Priority::Normal);
}

#[tokio::test]
async fn claimed_records_are_invisible_to_a_second_drain() {
    let q = queue();
    for i in 0..4 {
        q.enqueue(record(Topic::Telemetry, "x", i)).await.unwrap();
    }
    let first = q.fetch_pending(3).await.unwrap();
    let second = q.fetch_pending(10).await.unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 1);
    assert!(first.iter().all(|a| second.iter().all(|b| a.id != b.id)));
}

#[tokio::test]
async fn draining_twice_sends_each_record_once() {
    let q = queue();
    for i in 0..5 {
        q.enqueue(record(Topic::Telemetry, "x", i)).await.unwrap();
    }
    let mut sent = 0;
    for r in q.fetch_pending(10).await.unwrap() {
        q.mark_sent(r.id).await.unwrap();
        sent += 1;
    }
    assert_eq!(sent, 5);
    assert!(q.fetch_pending(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_records_wait_out_their_delay_then_dead_letter() {
    let config = QueueConfig {
        max_attempts: 3,
        retry_base_delay_secs: 10,
        retry_max_delay_secs: 60,
        ..QueueConfig::default()
    };
    let q = DurableQueue::open_in_memory(config).unwrap();
    let id = q.enqueue(record(Topic::Telemetry, "x", 0)).await.unwrap();
    let mut now = Utc::now();

    q.fetch_pending_at(1, now).await.unwrap();
    assert_eq!(
        q.mark_failed_at(id, "timeout", false, now).await.unwrap(),
        RecordStatus::Failed
    );
    // Not eligible until the 10s delay passes.
    assert!(q.fetch_pending_at(1, now + Duration::seconds(5)).await.unwrap().is_empty());

    now += Duration::seconds(11);
    assert_eq!(q.fetch_pending_at(1, now).await.unwrap().len(), 1);
    assert_eq!(
        q.mark_failed_at(id, "timeout", false, now).await.unwrap(),
        RecordStatus::Failed
    );

    now += Duration::seconds(21);
    assert_eq!(q.fetch_pending_at(1, now).await.unwrap().len(), 1);
    assert_eq!(
        q.mark_failed_at(id, "timeout", false, now).await.unwrap(),
        RecordStatus::Dead
    );

    // Dead records are kept for inspection and never retried.
    assert!(q
        .fetch_pending_at(1, now + Duration::days(1))
        .await
        .unwrap()
        .is_empty());
    let dead = q.dead_letters(10).await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].attempts, 3);
    assert_eq!(dead[0].last_error.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn permanent_failure_dead_letters_immediately() {
    let q = queue();
    let id = q.enqueue(record(Topic::Telemetry, "x", 0)).await.unwrap();
    q.fetch_pending(1).await.unwrap();
    let status = q.mark_failed(id, "HTTP 413", true).await.unwrap();
    assert_eq!(status, RecordStatus::Dead);
}

#[tokio::test]
async fn failing_record_does_not_block_newer_ones() {
    let q = queue();
    let old = q.enqueue(record(Topic::Telemetry, "old", 0)).await.unwrap();
    q.enqueue(record(Topic::Telemetry, "new", 10)).await.unwrap();

    let batch = q.fetch_pending(1).await.unwrap();
    assert_eq!(batch[0].id, old);
    q.mark_failed(old, "boom", false).await.unwrap();

    let next = q.fetch_pending(10).await.unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].payload, b"new");
}

#[tokio::test]
async fn release_returns_claims_without_consuming_attempts() {
    let q = queue();
    q.enqueue(record(Topic::Telemetry, "x", 0)).await.unwrap();
    let batch = q.fetch_pending(1).await.unwrap();
    let ids: Vec<i64> = batch.iter().map(|r| r.id).collect();
    assert_eq!(q.release(&ids).await.unwrap(), 1);

    let again = q.fetch_pending(1).await.unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].attempts, 0);
}

#[tokio::test]
async fn mark_sent_unknown_id_is_an_error() {
    let q = queue();
    assert!(q.mark_sent(999).await.is_err());
}

#[tokio::test]
async fn prune_removes_only_old_records_of_status() {
    let q = queue();
    let old = q.enqueue(record(Topic::Telemetry, "old", 0)).await.unwrap();
    let fresh = q
        .enqueue(NewTelemetryRecord::new(Topic::Telemetry, b"fresh".to_vec()))
        .await
        .unwrap();
    q.fetch_pending(10).await.unwrap();
    q.mark_sent(old).await.unwrap();
    q.mark_sent(fresh).await.unwrap();

    let pruned = q
        .prune(Utc::now() - Duration::seconds(500), RecordStatus::Sent)
        .await
        .unwrap();
    assert_eq!(pruned, 1);
    assert!(q.get(old).await.unwrap().is_none());
    assert!(q.get(fresh).await.unwrap().is_some());
}

#[tokio::test]
async fn stats_count_by_status() {
    let q = queue();
    for i in 0..3 {
        q.enqueue(record(Topic::Telemetry, "abcd", i)).await.unwrap();
    }
    let batch = q.fetch_pending(1).await.unwrap();
    q.mark_sent(batch[0].id).await.unwrap();

    let stats = q.stats().await.unwrap();
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.pending_bytes, 8);
    assert_eq!(stats.depth(), 2);
}
