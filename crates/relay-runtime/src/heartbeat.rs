//! Periodic liveness record with host metrics.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use relay_core::errors::RelayResult;
use relay_core::models::{NewTelemetryRecord, Topic};
use relay_core::schedule::{run_periodic, CancellationToken};
use relay_observability::health::HostSnapshot;
use relay_storage::DurableQueue;

/// JSON body of one heartbeat.
pub fn heartbeat_payload(site_id: &str, host: &HostSnapshot, queue_depth: u64) -> serde_json::Value {
    json!({
        "timestamp": Utc::now().to_rfc3339(),
        "site_id": site_id,
        "status": "online",
        "system": host,
        "queue_depth": queue_depth,
    })
}

pub struct Heartbeat {
    queue: Arc<DurableQueue>,
    site_id: String,
    disk_path: PathBuf,
    thermal_zone: PathBuf,
    interval: Duration,
}

impl Heartbeat {
    pub fn new(
        queue: Arc<DurableQueue>,
        site_id: impl Into<String>,
        disk_path: impl Into<PathBuf>,
        thermal_zone: impl Into<PathBuf>,
        interval: Duration,
    ) -> Self {
        Self {
            queue,
            site_id: site_id.into(),
            disk_path: disk_path.into(),
            thermal_zone: thermal_zone.into(),
            interval,
        }
    }

    /// Sample the host and queue one heartbeat record.
    pub async fn beat(&self) -> RelayResult<i64> {
        let disk = self.disk_path.clone();
        let zone = self.thermal_zone.clone();
        let host = tokio::task::spawn_blocking(move || HostSnapshot::collect(&disk, &zone))
            .await
            .unwrap_or_default();
        let depth = self.queue.stats().await.map(|s| s.depth()).unwrap_or(0);
        let payload = serde_json::to_vec(&heartbeat_payload(&self.site_id, &host, depth))?;
        self.queue
            .enqueue(NewTelemetryRecord::new(Topic::Heartbeat, payload))
            .await
    }

    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        run_periodic("heartbeat", self.interval, cancel, || {
            let this = self.clone();
            async move {
                if let Err(e) = this.beat().await {
                    tracing::warn!(error = %e, "heartbeat: enqueue failed");
                }
            }
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_site_status_and_system() {
        let host = HostSnapshot {
            cpu_percent: 12.5,
            memory_percent: 40.0,
            disk_percent: 71.0,
            temperature_c: Some(55.2),
            uptime_secs: 3600,
        };
        let v = heartbeat_payload("farm-3", &host, 17);
        assert_eq!(v["site_id"], "farm-3");
        assert_eq!(v["status"], "online");
        assert_eq!(v["queue_depth"], 17);
        assert_eq!(v["system"]["cpu_percent"], 12.5);
        assert_eq!(v["system"]["temperature_c"], 55.2);
        assert_eq!(v["system"]["uptime_secs"], 3600);
        assert!(v["timestamp"].is_string());
    }
}
