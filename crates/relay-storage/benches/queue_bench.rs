use criterion::{criterion_group, criterion_main, Criterion};

use relay_core::config::QueueConfig;
use relay_core::models::{NewTelemetryRecord, Topic};
use relay_storage::DurableQueue;

fn bench_enqueue_and_drain(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let queue = DurableQueue::open(&dir.path().join("bench.db"), QueueConfig::default()).unwrap();
    let payload = vec![0u8; 256];

    c.bench_function("enqueue_256b", |b| {
        b.iter(|| {
            rt.block_on(queue.enqueue(NewTelemetryRecord::new(Topic::Telemetry, payload.clone())))
                .unwrap()
        })
    });

    c.bench_function("drain_batch_50", |b| {
        b.iter(|| {
            rt.block_on(async {
                for _ in 0..50 {
                    queue
                        .enqueue(NewTelemetryRecord::new(Topic::Telemetry, payload.clone()))
                        .await
                        .unwrap();
                }
                for r in queue.fetch_pending(50).await.unwrap() {
                    queue.mark_sent(r.id).await.unwrap();
                }
            })
        })
    });
}

criterion_group!(benches, bench_enqueue_and_drain);
criterion_main!(benches);
