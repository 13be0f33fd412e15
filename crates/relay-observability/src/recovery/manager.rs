use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use relay_core::config::RecoveryConfig;
use relay_core::errors::{HealthError, RelayResult};
use relay_core::models::{RecoveryAction, RecoveryEvent, RecoveryKind, RecoveryOutcome};
use relay_core::schedule::CancellationToken;
use relay_core::traits::{ConnectionControl, RecoveryJournal, StorageCleanup};

use crate::events;
use crate::health::{HealthMonitor, UnhealthyTransition};

/// In-memory audit entries kept for quick reads.
const EVENT_LOG_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryStats {
    /// Actions actually run (succeeded + failed).
    pub executed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub suppressed: u64,
}

/// Reacts to unhealthy transitions with a component-specific action,
/// at most once per component per cooldown window.
///
/// Actions run on their own tasks so a slow reinitialization never holds
/// up the health poll or other recoveries.
pub struct RecoveryManager {
    config: RecoveryConfig,
    monitor: Arc<HealthMonitor>,
    cleanup: Option<Arc<dyn StorageCleanup>>,
    connection: Option<Arc<dyn ConnectionControl>>,
    journal: Option<Arc<dyn RecoveryJournal>>,
    last_recovery: DashMap<String, DateTime<Utc>>,
    log: Mutex<VecDeque<RecoveryEvent>>,
    succeeded: AtomicU64,
    failed: AtomicU64,
    suppressed: AtomicU64,
}

impl RecoveryManager {
    pub fn new(config: RecoveryConfig, monitor: Arc<HealthMonitor>) -> Self {
        Self {
            config,
            monitor,
            cleanup: None,
            connection: None,
            journal: None,
            last_recovery: DashMap::new(),
            log: Mutex::new(VecDeque::with_capacity(EVENT_LOG_CAPACITY)),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
        }
    }

    pub fn with_cleanup(mut self, cleanup: Arc<dyn StorageCleanup>) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    pub fn with_connection(mut self, connection: Arc<dyn ConnectionControl>) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn with_journal(mut self, journal: Arc<dyn RecoveryJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Consume transitions until cancelled or the monitor goes away.
    pub async fn run(
        self: Arc<Self>,
        mut transitions: mpsc::UnboundedReceiver<UnhealthyTransition>,
        cancel: CancellationToken,
    ) {
        tracing::debug!("recovery manager started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = transitions.recv() => match next {
                    Some(transition) => {
                        self.handle(transition).await;
                    }
                    None => break,
                },
            }
        }
        tracing::debug!("recovery manager stopped");
    }

    /// Decide on one transition. Returns the handle of the spawned action,
    /// or `None` when it was suppressed or needs no action.
    pub async fn handle(
        self: &Arc<Self>,
        transition: UnhealthyTransition,
    ) -> Option<JoinHandle<RecoveryEvent>> {
        let component = transition.component.clone();
        if transition.kind == RecoveryKind::None {
            tracing::debug!(component = %component, "recovery: component is observed only");
            return None;
        }

        let now = Utc::now();
        let cooldown = chrono::Duration::seconds(self.config.cooldown_secs as i64);
        if let Some(last) = self.last_recovery.get(&component).map(|t| *t) {
            let elapsed = now - last;
            if elapsed < cooldown {
                let remaining = (cooldown - elapsed).num_seconds();
                events::recovery_suppressed(&component, remaining);
                self.suppressed.fetch_add(1, Ordering::Relaxed);
                self.record(RecoveryEvent::new(
                    component,
                    RecoveryAction::None,
                    RecoveryOutcome::Suppressed,
                    Some(format!("cooldown: {remaining}s remaining")),
                ))
                .await;
                return None;
            }
        }

        // Claim the window before acting so a transition arriving while the
        // action runs is suppressed.
        self.last_recovery.insert(component.clone(), now);
        self.monitor.note_recovery(&component, now);

        let manager = self.clone();
        Some(tokio::spawn(async move {
            let (action, result) = manager.execute(&transition).await;
            let (outcome, detail) = match result {
                Ok(detail) => {
                    manager.succeeded.fetch_add(1, Ordering::Relaxed);
                    (RecoveryOutcome::Succeeded, detail)
                }
                Err(e) => {
                    manager.failed.fetch_add(1, Ordering::Relaxed);
                    (RecoveryOutcome::Failed, e.to_string())
                }
            };
            events::recovery_executed(&transition.component, action, outcome);
            let event = RecoveryEvent::new(
                transition.component.clone(),
                action,
                outcome,
                Some(detail),
            );
            manager.record(event.clone()).await;
            event
        }))
    }

    async fn execute(&self, transition: &UnhealthyTransition) -> (RecoveryAction, RelayResult<String>) {
        match transition.kind {
            RecoveryKind::Sensor => (
                RecoveryAction::Reinitialize,
                self.reinitialize_sensor(transition).await,
            ),
            RecoveryKind::DiskSpace => (
                RecoveryAction::EmergencyCleanup,
                self.emergency_cleanup(&transition.component).await,
            ),
            RecoveryKind::Delivery => (
                RecoveryAction::ForceReconnect,
                self.force_reconnect(&transition.component),
            ),
            RecoveryKind::None => (RecoveryAction::None, Ok("no action".to_string())),
        }
    }

    /// Close, settle, reopen. The failure counter is only reset when the
    /// reopen succeeds.
    async fn reinitialize_sensor(&self, transition: &UnhealthyTransition) -> RelayResult<String> {
        let target = &transition.target;
        if let Err(e) = target.shutdown().await {
            tracing::warn!(
                component = %transition.component,
                error = %e,
                "recovery: shutdown failed, reinitializing anyway"
            );
        }
        tokio::time::sleep(Duration::from_secs(self.config.sensor_settle_secs)).await;
        target.reinitialize().await.map_err(|e| HealthError::RecoveryFailed {
            component: transition.component.clone(),
            reason: e.to_string(),
        })?;
        self.monitor.reset_failures(&transition.component);
        Ok("reinitialized".to_string())
    }

    async fn emergency_cleanup(&self, component: &str) -> RelayResult<String> {
        let cleanup = self.cleanup.as_ref().ok_or_else(|| HealthError::RecoveryFailed {
            component: component.to_string(),
            reason: "no storage cleanup configured".to_string(),
        })?;
        let report = cleanup.emergency_cleanup().await?;
        Ok(format!(
            "freed {} bytes ({} files, {} records)",
            report.bytes_freed(),
            report.files_deleted,
            report.records_evicted
        ))
    }

    fn force_reconnect(&self, component: &str) -> RelayResult<String> {
        let connection = self.connection.as_ref().ok_or_else(|| HealthError::RecoveryFailed {
            component: component.to_string(),
            reason: "no connection manager configured".to_string(),
        })?;
        let previous = connection.state();
        connection.force_reconnect();
        Ok(format!("reconnect requested (was {previous})"))
    }

    async fn record(&self, event: RecoveryEvent) {
        {
            let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
            if log.len() >= EVENT_LOG_CAPACITY {
                log.pop_front();
            }
            log.push_back(event.clone());
        }
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append(&event).await {
                tracing::warn!(
                    component = %event.component,
                    error = %e,
                    "recovery: failed to persist recovery event"
                );
            }
        }
    }

    /// Most recent events, newest first. Reads the persisted journal when
    /// one is attached, the in-memory log otherwise.
    pub async fn recent_events(&self, limit: usize) -> Vec<RecoveryEvent> {
        if let Some(journal) = &self.journal {
            match journal.recent(limit).await {
                Ok(events) => return events,
                Err(e) => {
                    tracing::warn!(error = %e, "recovery: journal read failed, using memory log");
                }
            }
        }
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn last_recovery(&self, component: &str) -> Option<DateTime<Utc>> {
        self.last_recovery.get(component).map(|t| *t)
    }

    pub fn stats(&self) -> RecoveryStats {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        RecoveryStats {
            executed: succeeded + failed,
            succeeded,
            failed,
            suppressed: self.suppressed.load(Ordering::Relaxed),
        }
    }
}
