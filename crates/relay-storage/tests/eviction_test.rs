use relay_core::config::QueueConfig;
use relay_core::models::{NewTelemetryRecord, Priority, RecordStatus, Topic};
use relay_storage::DurableQueue;

fn capped(max_pending: u64) -> DurableQueue {
    DurableQueue::open_in_memory(QueueConfig {
        max_pending,
        eviction_fraction: 0.5,
        ..QueueConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn ceiling_of_100_with_150_records_evicts_exactly_the_50_oldest() {
    let q = capped(100);
    let mut ids = Vec::new();
    for i in 0..150 {
        ids.push(
            q.enqueue(NewTelemetryRecord::new(
                Topic::Telemetry,
                format!("r{i}").into_bytes(),
            ))
            .await
            .unwrap(),
        );
    }

    assert!(q.count_pending().await.unwrap() <= 100);
    let evicted = q.list_by_status(RecordStatus::Evicted, 1000).await.unwrap();
    assert_eq!(evicted.len(), 50);
    let evicted_ids: Vec<i64> = evicted.iter().map(|r| r.id).collect();
    assert_eq!(evicted_ids, ids[..50].to_vec());
    assert!(evicted.iter().all(|r| r.priority == Priority::Normal));
    assert_eq!(q.evicted_total(), 50);
}

#[tokio::test]
async fn alerts_are_never_evicted() {
    let q = capped(10);
    for _ in 0..8 {
        q.enqueue(NewTelemetryRecord::new(Topic::Alerts, b"alert".to_vec()))
            .await
            .unwrap();
    }
    for _ in 0..10 {
        q.enqueue(NewTelemetryRecord::new(Topic::Telemetry, b"t".to_vec()))
            .await
            .unwrap();
    }

    let stats = q.stats().await.unwrap();
    assert!(stats.evicted > 0);
    let evicted = q.list_by_status(RecordStatus::Evicted, 100).await.unwrap();
    assert!(evicted.iter().all(|r| r.topic != Topic::Alerts));
    let pending = q.list_by_status(RecordStatus::Pending, 100).await.unwrap();
    assert_eq!(
        pending.iter().filter(|r| r.topic == Topic::Alerts).count(),
        8
    );
}

#[tokio::test]
async fn eviction_clears_payload_but_keeps_the_row() {
    let q = capped(2);
    let first = q
        .enqueue(NewTelemetryRecord::new(Topic::Telemetry, vec![7u8; 512]))
        .await
        .unwrap();
    for _ in 0..2 {
        q.enqueue(NewTelemetryRecord::new(Topic::Telemetry, vec![1u8; 16]))
            .await
            .unwrap();
    }
    let evicted = q.get(first).await.unwrap().unwrap();
    assert_eq!(evicted.status, RecordStatus::Evicted);
    assert!(evicted.payload.is_empty());
    assert!(evicted.last_error.unwrap().contains("capacity"));
}

#[tokio::test]
async fn emergency_eviction_takes_a_fraction_of_oldest_telemetry() {
    let q = capped(1000);
    for _ in 0..10 {
        q.enqueue(NewTelemetryRecord::new(Topic::Telemetry, vec![0u8; 100]))
            .await
            .unwrap();
    }
    q.enqueue(NewTelemetryRecord::new(Topic::Alerts, vec![0u8; 100]))
        .await
        .unwrap();

    let eviction = q.evict_oldest_pending(0.3).await.unwrap();
    assert_eq!(eviction.records, 3);
    assert_eq!(eviction.bytes, 300);

    let stats = q.stats().await.unwrap();
    assert_eq!(stats.evicted, 3);
    assert_eq!(stats.pending, 8);
}
