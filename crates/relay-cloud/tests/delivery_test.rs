use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use relay_cloud::delivery::{DrainReport, DrainSkip};
use relay_cloud::{ConnectionManager, DeliveryEngine, DeliveryHealth};
use relay_core::config::{BrokerConfig, ConnectionConfig, DeliveryConfig, QueueConfig};
use relay_core::errors::{AuthError, NetworkError, RelayResult};
use relay_core::models::{ConnectionState, NewTelemetryRecord, RecordStatus, Topic};
use relay_core::traits::{BrokerTransport, HealthCheckable, OutboundMessage};
use relay_storage::DurableQueue;

/// Records every publish; plays back scripted results in order, then succeeds.
#[derive(Default)]
struct RecordingBroker {
    script: Mutex<VecDeque<RelayResult<()>>>,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingBroker {
    fn script(&self, results: Vec<RelayResult<()>>) {
        self.script.lock().unwrap().extend(results);
    }

    fn payloads(&self) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.payload.clone())
            .collect()
    }
}

#[async_trait]
impl BrokerTransport for RecordingBroker {
    async fn connect(&self) -> RelayResult<()> {
        Ok(())
    }

    async fn publish(&self, message: &OutboundMessage) -> RelayResult<()> {
        let next = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
        if next.is_ok() {
            self.sent.lock().unwrap().push(message.clone());
        }
        next
    }

    async fn disconnect(&self) -> RelayResult<()> {
        Ok(())
    }
}

struct Harness {
    queue: Arc<DurableQueue>,
    broker: Arc<RecordingBroker>,
    connection: Arc<ConnectionManager>,
    reachable: watch::Sender<bool>,
    engine: DeliveryEngine,
}

async fn harness(config: DeliveryConfig) -> Harness {
    let queue = Arc::new(
        DurableQueue::open_in_memory(QueueConfig {
            max_attempts: 3,
            retry_base_delay_secs: 0,
            retry_max_delay_secs: 0,
            ..QueueConfig::default()
        })
        .unwrap(),
    );
    let broker = Arc::new(RecordingBroker::default());
    let connection = Arc::new(ConnectionManager::new(
        broker.clone(),
        &BrokerConfig::default(),
        ConnectionConfig::default(),
    ));
    connection.connect().await.unwrap();
    let (reachable, rx) = watch::channel(true);
    let engine = DeliveryEngine::new(
        queue.clone(),
        connection.clone(),
        rx,
        config,
        "relay/site-1",
    );
    Harness {
        queue,
        broker,
        connection,
        reachable,
        engine,
    }
}

fn plain() -> DeliveryConfig {
    DeliveryConfig {
        compression_enabled: false,
        bandwidth_limit_kbps: 0,
        ..DeliveryConfig::default()
    }
}

async fn enqueue(q: &DurableQueue, topic: Topic, body: &str) -> i64 {
    q.enqueue(NewTelemetryRecord::new(topic, body.as_bytes().to_vec()))
        .await
        .unwrap()
}

#[tokio::test]
async fn drain_publishes_in_creation_order() {
    let h = harness(plain()).await;
    for body in ["a", "b", "c"] {
        enqueue(&h.queue, Topic::Telemetry, body).await;
    }

    let report = h.engine.drain_once().await.unwrap();
    assert_eq!(report.claimed, 3);
    assert_eq!(report.published, 3);
    assert_eq!(h.broker.payloads(), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    assert_eq!(h.queue.count_pending().await.unwrap(), 0);

    let sent = h.broker.sent.lock().unwrap();
    assert_eq!(sent[0].topic, "relay/site-1/telemetry");
    assert_eq!(sent[0].qos, 1);
}

#[tokio::test]
async fn heartbeat_goes_out_at_qos_zero() {
    let h = harness(plain()).await;
    enqueue(&h.queue, Topic::Heartbeat, "{}").await;
    h.engine.drain_once().await.unwrap();
    let sent = h.broker.sent.lock().unwrap();
    assert_eq!(sent[0].topic, "relay/site-1/heartbeat");
    assert_eq!(sent[0].qos, 0);
}

#[tokio::test]
async fn failed_record_does_not_block_the_rest() {
    let h = harness(plain()).await;
    let first = enqueue(&h.queue, Topic::Telemetry, "bad").await;
    enqueue(&h.queue, Topic::Telemetry, "good").await;
    h.broker.script(vec![Err(NetworkError::Rejected {
        status: 400,
        body: "malformed".into(),
    }
    .into())]);

    let report = h.engine.drain_once().await.unwrap();
    assert_eq!(report.published, 1);
    assert_eq!(report.dead_lettered, 1);
    assert_eq!(h.broker.payloads(), vec![b"good".to_vec()]);
    // A rejected payload will never succeed: dead on the first attempt.
    let record = h.queue.get(first).await.unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::Dead);
}

#[tokio::test]
async fn unreachable_network_skips_without_consuming_attempts() {
    let h = harness(plain()).await;
    let id = enqueue(&h.queue, Topic::Telemetry, "x").await;
    h.reachable.send_replace(false);

    let report = h.engine.drain_once().await.unwrap();
    assert_eq!(
        report,
        DrainReport {
            skipped: Some(DrainSkip::Unreachable),
            ..DrainReport::default()
        }
    );
    let record = h.queue.get(id).await.unwrap().unwrap();
    assert_eq!(record.attempts, 0);
    assert_eq!(record.status, RecordStatus::Pending);
    assert_eq!(h.engine.stats().await.skipped_unreachable, 1);
}

#[tokio::test]
async fn lost_session_hands_the_batch_back() {
    let h = harness(plain()).await;
    let ids = [
        enqueue(&h.queue, Topic::Telemetry, "1").await,
        enqueue(&h.queue, Topic::Telemetry, "2").await,
        enqueue(&h.queue, Topic::Telemetry, "3").await,
    ];
    // First publish ok, second drops the connection.
    h.broker.script(vec![
        Ok(()),
        Err(NetworkError::Transient {
            reason: "broken pipe".into(),
        }
        .into()),
    ]);

    let report = h.engine.drain_once().await.unwrap();
    assert_eq!(report.published, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.released, 1);
    assert_eq!(h.connection.state(), ConnectionState::Disconnected);

    assert_eq!(h.queue.get(ids[1]).await.unwrap().unwrap().attempts, 1);
    let third = h.queue.get(ids[2]).await.unwrap().unwrap();
    assert_eq!(third.attempts, 0);
    assert_eq!(third.status, RecordStatus::Pending);

    // Nothing is attempted until the session is back.
    let report = h.engine.drain_once().await.unwrap();
    assert_eq!(report.skipped, Some(DrainSkip::NotConnected));
}

#[tokio::test]
async fn credential_rejection_stops_the_cycle() {
    let h = harness(plain()).await;
    let a = enqueue(&h.queue, Topic::Telemetry, "a").await;
    let b = enqueue(&h.queue, Topic::Telemetry, "b").await;
    h.broker.script(vec![Err(AuthError::PermanentAuth {
        reason: "expired".into(),
    }
    .into())]);

    let report = h.engine.drain_once().await.unwrap();
    assert_eq!(report.released, 2);
    for id in [a, b] {
        let r = h.queue.get(id).await.unwrap().unwrap();
        assert_eq!(r.status, RecordStatus::Pending);
        assert_eq!(r.attempts, 0);
    }
}

#[tokio::test]
async fn repeated_failures_dead_letter_at_the_cap() {
    let h = harness(plain()).await;
    let id = enqueue(&h.queue, Topic::Telemetry, "x").await;

    for _ in 0..3 {
        h.connection.connect().await.unwrap();
        h.broker.script(vec![Err(NetworkError::Transient {
            reason: "timeout".into(),
        }
        .into())]);
        h.engine.drain_once().await.unwrap();
    }

    let record = h.queue.get(id).await.unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::Dead);
    assert_eq!(record.attempts, 3);
    let stats = h.engine.stats().await;
    assert_eq!(stats.failed, 3);
    assert_eq!(stats.dead_lettered, 1);
    assert_eq!(stats.queue_depth, 0);
}

#[tokio::test]
async fn compression_only_when_smaller() {
    let h = harness(DeliveryConfig {
        compression_enabled: true,
        bandwidth_limit_kbps: 0,
        ..DeliveryConfig::default()
    })
    .await;
    let big = r#"{"sensor":"thermal","reading":36.6}"#.repeat(40);
    enqueue(&h.queue, Topic::Telemetry, &big).await;
    enqueue(&h.queue, Topic::Telemetry, "{}").await;

    h.engine.drain_once().await.unwrap();
    let sent = h.broker.sent.lock().unwrap();
    assert_eq!(sent[0].content_encoding, Some("zstd"));
    assert!(sent[0].payload.len() < big.len());
    assert_eq!(sent[1].content_encoding, None);
    assert_eq!(sent[1].payload, b"{}");
    drop(sent);

    let stats = h.engine.stats().await;
    assert_eq!(stats.published, 2);
    assert!(stats.bytes_saved > 0);
    assert!(stats.bytes_sent < big.len() as u64);
}

#[tokio::test]
async fn savings_count_only_once_a_record_is_sent() {
    let h = harness(DeliveryConfig {
        compression_enabled: true,
        bandwidth_limit_kbps: 0,
        ..DeliveryConfig::default()
    })
    .await;
    let big = r#"{"sensor":"humidity","reading":71.2}"#.repeat(40);
    enqueue(&h.queue, Topic::Telemetry, &big).await;
    h.broker.script(vec![Err(NetworkError::Transient {
        reason: "broken pipe".into(),
    }
    .into())]);

    let report = h.engine.drain_once().await.unwrap();
    assert_eq!(report.published, 0);
    assert_eq!(h.engine.stats().await.bytes_saved, 0);

    h.connection.connect().await.unwrap();
    let report = h.engine.drain_once().await.unwrap();
    assert_eq!(report.published, 1);
    let stats = h.engine.stats().await;
    assert!(stats.bytes_saved > 0);
    assert!(stats.bytes_saved < big.len() as u64);
}

#[tokio::test]
async fn alerts_are_published_first() {
    let h = harness(plain()).await;
    enqueue(&h.queue, Topic::Telemetry, "reading").await;
    enqueue(&h.queue, Topic::Alerts, "fire").await;

    h.engine.drain_once().await.unwrap();
    assert_eq!(h.broker.payloads(), vec![b"fire".to_vec(), b"reading".to_vec()]);
}

#[tokio::test]
async fn delivery_health_reflects_session_and_network() {
    let h = harness(plain()).await;
    let health = DeliveryHealth::new(
        h.connection.clone(),
        h.queue.clone(),
        h.reachable.subscribe(),
    );
    assert!(health.probe().await.ok);

    h.connection.disconnect().await;
    assert!(!health.probe().await.ok);

    h.reachable.send_replace(false);
    assert!(health.probe().await.ok);
}

/// Make every `mark_sent` on the queue file fail until the guard is lifted.
fn block_settling(db: &std::path::Path) -> rusqlite::Connection {
    let conn = rusqlite::Connection::open(db).unwrap();
    conn.execute_batch(
        "CREATE TRIGGER block_sent BEFORE UPDATE OF status ON telemetry_records
         WHEN NEW.status = 'sent'
         BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END;",
    )
    .unwrap();
    conn
}

#[tokio::test]
async fn unsettled_batch_is_handed_back_after_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("queue.db");
    let queue = Arc::new(DurableQueue::open(&db, QueueConfig::default()).unwrap());
    let broker = Arc::new(RecordingBroker::default());
    let connection = Arc::new(ConnectionManager::new(
        broker.clone(),
        &BrokerConfig::default(),
        ConnectionConfig::default(),
    ));
    connection.connect().await.unwrap();
    let (_reachable, rx) = watch::channel(true);
    let engine = DeliveryEngine::new(queue.clone(), connection, rx, plain(), "relay/site-1");

    for body in ["a", "b", "c", "d", "e"] {
        enqueue(&queue, Topic::Telemetry, body).await;
    }

    let guard = block_settling(&db);
    assert!(engine.drain_once().await.is_err());
    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.pending, 5);

    guard.execute_batch("DROP TRIGGER block_sent;").unwrap();
    let report = engine.drain_once().await.unwrap();
    assert_eq!(report.claimed, 5);
    assert_eq!(report.published, 5);
    assert_eq!(queue.count_pending().await.unwrap(), 0);

    // "a" reached the broker before its settle failed, so it goes out twice.
    let payloads = broker.payloads();
    assert_eq!(payloads.len(), 6);
    assert_eq!(payloads[0], b"a".to_vec());
    assert_eq!(payloads[1], b"a".to_vec());
}
