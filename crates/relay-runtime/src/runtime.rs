//! RelayRuntime: owns the components, spawns their loops, and shuts them
//! down in order.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use relay_cloud::{
    BulkStats, BulkUploader, ConnectionManager, ConnectionStats, DeliveryEngine, DeliveryHealth,
    DeliveryStats, NetworkMonitor, NetworkStatus,
};
use relay_core::config::RelayConfig;
use relay_core::errors::{RelayError, RelayResult};
use relay_core::models::{
    ArtifactCategory, ArtifactQueueStats, HealthReport, HealthStatus, NewBulkArtifact,
    NewTelemetryRecord, QueueStats, RecoveryEvent, Topic,
};
use relay_core::schedule::{run_periodic, CancellationToken};
use relay_core::traits::{ConnectionControl, RecoveryJournal, StorageCleanup};
use relay_observability::health::{CpuTemperatureProbe, DiskProbe, MemoryProbe};
use relay_observability::{
    DegradationAlert, HealthMonitor, RecoveryManager, RecoveryStats, UnhealthyTransition,
};
use relay_storage::DurableQueue;

use crate::cleanup::EmergencyCleanup;
use crate::deps::RuntimeDeps;
use crate::heartbeat::Heartbeat;
use crate::watchdog::{Watchdog, WatchdogStats};

/// How often sent, dead, and evicted records past retention are pruned.
const PRUNE_INTERVAL: Duration = Duration::from_secs(3600);

/// Aggregated counters for operators and tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeStats {
    pub site_id: String,
    pub delivery: DeliveryStats,
    pub connection: ConnectionStats,
    pub bulk: BulkStats,
    pub queue: QueueStats,
    pub artifacts: ArtifactQueueStats,
    pub evicted_total: u64,
    pub network: NetworkStatus,
    pub health: HealthStatus,
    /// Components that keep degrading, most severe level each.
    pub alerts: Vec<DegradationAlert>,
    pub recovery: RecoveryStats,
    pub watchdog: WatchdogStats,
    pub storage_fatal: bool,
}

pub struct RelayRuntime {
    config: RelayConfig,
    queue: Arc<DurableQueue>,
    connection: Arc<ConnectionManager>,
    network: Arc<NetworkMonitor>,
    delivery: Arc<DeliveryEngine>,
    bulk: Arc<BulkUploader>,
    health: Arc<HealthMonitor>,
    recovery: Arc<RecoveryManager>,
    heartbeat: Arc<Heartbeat>,
    watchdog: Arc<Watchdog>,
    transitions: Mutex<Option<mpsc::UnboundedReceiver<UnhealthyTransition>>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
    fatal: Arc<AtomicBool>,
    fatal_notify: Arc<Notify>,
}

impl RelayRuntime {
    /// Wire every component. Nothing runs until [`start`](Self::start).
    pub fn new(config: RelayConfig, deps: RuntimeDeps) -> RelayResult<Self> {
        config.validate()?;

        let queue = match deps.queue {
            Some(queue) => queue,
            None => Arc::new(DurableQueue::open_configured(config.queue.clone())?),
        };

        let connection = Arc::new(ConnectionManager::new(
            deps.transport,
            &config.broker,
            config.connection.clone(),
        ));
        let network = Arc::new(
            NetworkMonitor::new(deps.reachability, config.network.clone())
                .with_connection(connection.clone()),
        );
        let topic_base = format!("{}/{}", config.broker.topic_prefix, config.site.id);
        let delivery = Arc::new(DeliveryEngine::new(
            queue.clone(),
            connection.clone(),
            network.subscribe(),
            config.delivery.clone(),
            topic_base,
        ));
        let bulk = Arc::new(
            BulkUploader::new(
                queue.clone(),
                deps.object_store,
                config.bulk.clone(),
                config.site.id.clone(),
            )
            .with_reachability(network.subscribe()),
        );

        let (monitor, transitions) = HealthMonitor::new(config.health.clone());
        let health = Arc::new(
            monitor.with_retry_interval(Duration::from_secs(config.recovery.cooldown_secs)),
        );
        if deps.host_probes {
            health.register(Arc::new(DiskProbe::new(
                &config.health.disk_path,
                config.health.min_free_disk_bytes,
            )));
            health.register(Arc::new(MemoryProbe::new(config.health.max_memory_percent)));
            health.register(Arc::new(CpuTemperatureProbe::new(
                &config.health.thermal_zone_path,
                config.health.max_cpu_temp_c,
            )));
        }
        health.register(Arc::new(DeliveryHealth::new(
            connection.clone(),
            queue.clone(),
            network.subscribe(),
        )));
        for sensor in deps.sensors {
            health.register(sensor);
        }

        let cleanup: Arc<dyn StorageCleanup> = match deps.cleanup {
            Some(cleanup) => cleanup,
            None => Arc::new(EmergencyCleanup::new(
                &config.storage,
                &config.recovery,
                queue.clone(),
                &config.health.disk_path,
            )),
        };
        let control: Arc<dyn ConnectionControl> = connection.clone();
        let journal: Arc<dyn RecoveryJournal> = queue.clone();
        let recovery = Arc::new(
            RecoveryManager::new(config.recovery.clone(), health.clone())
                .with_cleanup(cleanup)
                .with_connection(control)
                .with_journal(journal),
        );

        let heartbeat = Arc::new(Heartbeat::new(
            queue.clone(),
            config.site.id.clone(),
            PathBuf::from(&config.health.disk_path),
            PathBuf::from(&config.health.thermal_zone_path),
            Duration::from_secs(config.heartbeat.interval_secs),
        ));
        let watchdog = Arc::new(Watchdog::from_config(&config.watchdog));

        tracing::info!(
            site = %config.site.id,
            endpoint = %config.broker.endpoint,
            components = health.component_names().len(),
            "relay runtime wired"
        );

        Ok(Self {
            config,
            queue,
            connection,
            network,
            delivery,
            bulk,
            health,
            recovery,
            heartbeat,
            watchdog,
            transitions: Mutex::new(Some(transitions)),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            fatal: Arc::new(AtomicBool::new(false)),
            fatal_notify: Arc::new(Notify::new()),
        })
    }

    /// Production wiring: HTTPS broker, configured object store, TCP probe.
    pub fn from_config(config: RelayConfig) -> RelayResult<Self> {
        let deps = RuntimeDeps::production(&config)?;
        Self::new(config, deps)
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<DurableQueue> {
        &self.queue
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    /// Spawn every background loop. Fails if already started.
    pub fn start(&self) -> RelayResult<()> {
        let transitions = self
            .transitions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| RelayError::ConfigError("runtime already started".into()))?;

        let c = &self.cancel;
        let mut tasks = vec![
            ("connection", tokio::spawn(self.connection.clone().run(c.clone()))),
            ("network", tokio::spawn(self.network.clone().run(c.clone()))),
            ("delivery", tokio::spawn(self.delivery.clone().run(c.clone()))),
            ("bulk", tokio::spawn(self.bulk.clone().run(c.clone()))),
            ("health", tokio::spawn(self.health.clone().run(c.clone()))),
            (
                "recovery",
                tokio::spawn(self.recovery.clone().run(transitions, c.clone())),
            ),
            (
                "maintenance",
                tokio::spawn(maintenance_loop(
                    self.queue.clone(),
                    Duration::from_secs(self.config.health.check_interval_secs),
                    self.fatal.clone(),
                    self.fatal_notify.clone(),
                    c.clone(),
                )),
            ),
        ];
        if self.config.heartbeat.enabled {
            tasks.push(("heartbeat", tokio::spawn(self.heartbeat.clone().run(c.clone()))));
        }
        if self.config.watchdog.enabled {
            tasks.push(("watchdog", tokio::spawn(self.watchdog.clone().run(c.clone()))));
        }

        tracing::info!(loops = tasks.len(), "relay runtime started");
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(tasks);
        Ok(())
    }

    // --- producer API ---

    /// Queue a telemetry payload. The `alerts` topic drains first.
    pub async fn enqueue_telemetry(&self, payload: Vec<u8>, topic: &str) -> RelayResult<i64> {
        self.queue
            .enqueue(NewTelemetryRecord::new(Topic::from(topic), payload))
            .await
    }

    pub async fn enqueue_alert(&self, payload: Vec<u8>) -> RelayResult<i64> {
        self.queue
            .enqueue(NewTelemetryRecord::new(Topic::Alerts, payload))
            .await
    }

    /// Queue a finished file for upload. An empty key is derived from the
    /// site, today's date, and the inferred category.
    pub async fn enqueue_artifact(
        &self,
        path: impl AsRef<Path>,
        destination_key: &str,
    ) -> RelayResult<i64> {
        self.bulk
            .enqueue(NewBulkArtifact::new(path.as_ref(), destination_key))
            .await
    }

    pub async fn enqueue_artifact_with(
        &self,
        path: impl AsRef<Path>,
        destination_key: &str,
        category: Option<ArtifactCategory>,
        priority: bool,
    ) -> RelayResult<i64> {
        let mut artifact =
            NewBulkArtifact::new(path.as_ref(), destination_key).with_priority(priority);
        if let Some(category) = category {
            artifact = artifact.with_category(category);
        }
        self.bulk.enqueue(artifact).await
    }

    // --- observation ---

    pub async fn stats(&self) -> RelayResult<RuntimeStats> {
        Ok(RuntimeStats {
            site_id: self.config.site.id.clone(),
            delivery: self.delivery.stats().await,
            connection: self.connection.stats(),
            bulk: self.bulk.stats().await,
            queue: self.queue.stats().await?,
            artifacts: self.queue.artifact_stats().await?,
            evicted_total: self.queue.evicted_total(),
            network: self.network.status(),
            health: self.health.report().overall_status,
            alerts: self.health.alerts(),
            recovery: self.recovery.stats(),
            watchdog: self.watchdog.stats(),
            storage_fatal: self.is_fatal(),
        })
    }

    pub fn health_report(&self) -> HealthReport {
        self.health.report()
    }

    /// Newest first.
    pub async fn recovery_events(&self, limit: usize) -> Vec<RecoveryEvent> {
        self.recovery.recent_events(limit).await
    }

    /// True once the queue medium has been declared lost.
    pub fn is_fatal(&self) -> bool {
        self.fatal.load(Ordering::SeqCst)
    }

    /// Resolves when the queue medium is lost. The process should exit.
    pub async fn fatal(&self) {
        let notified = self.fatal_notify.notified();
        if self.is_fatal() {
            return;
        }
        notified.await;
    }

    /// Stop every loop, close the broker session, and checkpoint the queue.
    pub async fn shutdown(&self, grace: Duration) {
        tracing::info!(grace_secs = grace.as_secs(), "relay runtime shutting down");
        self.cancel.cancel();

        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        let deadline = tokio::time::Instant::now() + grace;
        for (name, mut handle) in tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(task = name, error = %e, "loop ended abnormally"),
                Err(_) => {
                    tracing::warn!(task = name, "loop did not stop within grace period, aborting");
                    handle.abort();
                }
            }
        }

        self.connection.disconnect().await;
        if let Err(e) = self.queue.checkpoint().await {
            tracing::warn!(error = %e, "queue checkpoint on shutdown failed");
        }
        self.watchdog.close();
        tracing::info!("relay runtime stopped");
    }
}

/// Prune expired records hourly and escalate once the queue medium is lost.
async fn maintenance_loop(
    queue: Arc<DurableQueue>,
    period: Duration,
    fatal: Arc<AtomicBool>,
    fatal_notify: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut last_prune: Option<tokio::time::Instant> = None;
    run_periodic("queue_maintenance", period, cancel, || {
        let queue = queue.clone();
        let fatal = fatal.clone();
        let fatal_notify = fatal_notify.clone();
        let now = tokio::time::Instant::now();
        let prune_due = last_prune.map_or(true, |t| now.duration_since(t) >= PRUNE_INTERVAL);
        if prune_due {
            last_prune = Some(now);
        }
        async move {
            if queue.is_fatal() {
                if !fatal.swap(true, Ordering::SeqCst) {
                    tracing::error!(
                        failures = queue.consecutive_storage_failures(),
                        "queue storage lost; delivery guarantee can no longer be upheld"
                    );
                }
                fatal_notify.notify_waiters();
                return;
            }
            if prune_due {
                match queue.prune_expired().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(pruned = n, "queue: expired records pruned"),
                    Err(e) => tracing::warn!(error = %e, "queue: prune failed"),
                }
            }
        }
    })
    .await;
}

/// Process entry point: start, run until Ctrl-C or storage loss, shut down.
pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let runtime = RelayRuntime::from_config(config)?;
    runtime.start()?;

    let result = tokio::select! {
        signal = tokio::signal::ctrl_c() => signal.map_err(anyhow::Error::from),
        _ = runtime.fatal() => Err(anyhow::anyhow!("queue storage lost")),
    };

    let grace = Duration::from_secs(runtime.config().broker.disconnect_timeout_secs.max(5));
    runtime.shutdown(grace).await;
    result
}
