use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;

use relay_core::config::defaults::DEFAULT_RECOVERY_COOLDOWN_SECS;
use relay_core::config::HealthConfig;
use relay_core::models::{
    ComponentHealth, DegradationEvent, HealthReport, ProbeResult, RecoveryKind,
};
use relay_core::schedule::{run_periodic, CancellationToken};
use relay_core::traits::HealthCheckable;

use super::reporter::HealthReporter;
use crate::degradation::{
    evaluate_alerts, AlertLevel, DegradationAlert, DegradationTracker, TrackedDegradation,
};
use crate::events;

/// Emitted when a component crosses the failure threshold, and again every
/// retry interval while it stays unhealthy.
#[derive(Clone)]
pub struct UnhealthyTransition {
    pub component: String,
    pub kind: RecoveryKind,
    pub consecutive_failures: u32,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
    /// Handle the RecoveryManager acts on.
    pub target: Arc<dyn HealthCheckable>,
}

impl fmt::Debug for UnhealthyTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnhealthyTransition")
            .field("component", &self.component)
            .field("kind", &self.kind)
            .field("consecutive_failures", &self.consecutive_failures)
            .field("detail", &self.detail)
            .field("at", &self.at)
            .finish()
    }
}

/// Polls registered components and owns their [`ComponentHealth`] entries.
///
/// The RecoveryManager only reads entries, except for
/// [`reset_failures`](Self::reset_failures) and
/// [`note_recovery`](Self::note_recovery) after it has acted.
pub struct HealthMonitor {
    config: HealthConfig,
    components: RwLock<Vec<Arc<dyn HealthCheckable>>>,
    health: DashMap<String, ComponentHealth>,
    degradation: Mutex<DegradationTracker>,
    transitions: mpsc::UnboundedSender<UnhealthyTransition>,
    /// Minimum spacing between transitions for a component that stays unhealthy.
    retry_interval: chrono::Duration,
    last_emitted: DashMap<String, DateTime<Utc>>,
    /// Alerts already logged, so each is reported once per level.
    raised: Mutex<Vec<(String, AlertLevel)>>,
}

impl HealthMonitor {
    /// Returns the monitor and the receiving end of its unhealthy transitions.
    pub fn new(config: HealthConfig) -> (Self, mpsc::UnboundedReceiver<UnhealthyTransition>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = Self {
            config,
            components: RwLock::new(Vec::new()),
            health: DashMap::new(),
            degradation: Mutex::new(DegradationTracker::new()),
            transitions: tx,
            retry_interval: chrono::Duration::seconds(DEFAULT_RECOVERY_COOLDOWN_SECS as i64),
            last_emitted: DashMap::new(),
            raised: Mutex::new(Vec::new()),
        };
        (monitor, rx)
    }

    /// How long a component must stay unhealthy after its last recovery (or
    /// last transition) before recovery is requested again. Set it to the
    /// recovery cooldown.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = chrono::Duration::from_std(interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_RECOVERY_COOLDOWN_SECS as i64));
        self
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Add a component. A component registered under an existing name replaces it.
    pub fn register(&self, component: Arc<dyn HealthCheckable>) {
        let name = component.name().to_string();
        let mut components = self.components.write().unwrap_or_else(|e| e.into_inner());
        if let Some(pos) = components.iter().position(|c| c.name() == name) {
            tracing::warn!(component = %name, "health: replacing registered component");
            components[pos] = component.clone();
        } else {
            components.push(component.clone());
        }
        self.health
            .insert(name.clone(), ComponentHealth::new(name, component.recovery_kind()));
    }

    pub fn component_names(&self) -> Vec<String> {
        self.snapshot_components()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    fn snapshot_components(&self) -> Vec<Arc<dyn HealthCheckable>> {
        self.components
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn tracker(&self) -> MutexGuard<'_, DegradationTracker> {
        self.degradation.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Probe every component concurrently, each under its own timeout.
    /// Returns the number of unhealthy transitions emitted.
    pub async fn check_all(&self) -> usize {
        let timeout = Duration::from_secs(self.config.probe_timeout_secs);
        let handles: Vec<_> = self
            .snapshot_components()
            .into_iter()
            .map(|component| {
                let probed = component.clone();
                let handle = tokio::spawn(async move {
                    let started = Instant::now();
                    let result = probe_with_timeout(probed.as_ref(), timeout).await;
                    (result, started.elapsed())
                });
                (component, handle)
            })
            .collect();

        let mut transitions = 0;
        for (component, handle) in handles {
            let (result, latency) = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => (
                    ProbeResult::unhealthy(format!("probe task failed: {e}")),
                    timeout,
                ),
            };
            if self.apply(&component, result, latency) {
                transitions += 1;
            }
        }
        transitions
    }

    /// Fold one probe result into the component's entry. Returns true when
    /// a transition was emitted.
    fn apply(
        &self,
        component: &Arc<dyn HealthCheckable>,
        result: ProbeResult,
        latency: Duration,
    ) -> bool {
        let name = component.name().to_string();
        let threshold = self.config.failure_threshold;

        let mut entry = self
            .health
            .entry(name.clone())
            .or_insert_with(|| ComponentHealth::new(name.clone(), component.recovery_kind()));
        entry.last_probe_ok = Some(result.ok);
        entry.latency_ms = Some(latency.as_millis() as u64);
        entry.detail = result.detail.clone();
        entry.last_checked = Some(Utc::now());

        if result.ok {
            let was_unhealthy = entry.unhealthy;
            entry.consecutive_failures = 0;
            entry.unhealthy = false;
            drop(entry);
            if was_unhealthy {
                events::component_recovered(&name);
                self.tracker().mark_recovered(&name);
            }
            return false;
        }

        entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
        let failures = entry.consecutive_failures;
        if failures < threshold {
            tracing::debug!(
                component = %name,
                consecutive_failures = failures,
                "health: probe failed"
            );
            return false;
        }

        let now = Utc::now();
        let first = !entry.unhealthy;
        if !first {
            let since = entry
                .last_recovery
                .into_iter()
                .chain(self.last_emitted.get(&name).map(|t| *t))
                .max();
            if since.is_some_and(|t| now - t < self.retry_interval) {
                return false;
            }
        }
        entry.unhealthy = true;
        let kind = entry.kind;
        drop(entry);

        let detail = result.detail.unwrap_or_else(|| "probe failed".to_string());
        if first {
            events::component_unhealthy(&name, failures, &detail);
            self.tracker().record(DegradationEvent {
                component: name.clone(),
                failure: detail.clone(),
                timestamp: now,
            });
        } else {
            events::component_still_unhealthy(&name, failures, &detail);
        }
        self.last_emitted.insert(name.clone(), now);

        let transition = UnhealthyTransition {
            component: name.clone(),
            kind,
            consecutive_failures: failures,
            detail: Some(detail),
            at: now,
            target: component.clone(),
        };
        if self.transitions.send(transition).is_err() {
            tracing::debug!(component = %name, "health: no recovery listener");
        }
        true
    }

    /// Clear the failure counter after a successful recovery.
    pub fn reset_failures(&self, name: &str) {
        if let Some(mut entry) = self.health.get_mut(name) {
            entry.consecutive_failures = 0;
            entry.unhealthy = false;
        }
        self.tracker().mark_recovered(name);
        tracing::info!(component = %name, "health: failure counter reset");
    }

    pub fn note_recovery(&self, name: &str, at: DateTime<Utc>) {
        if let Some(mut entry) = self.health.get_mut(name) {
            entry.last_recovery = Some(at);
        }
    }

    pub fn component(&self, name: &str) -> Option<ComponentHealth> {
        self.health.get(name).map(|e| e.clone())
    }

    /// Entries in registration order.
    pub fn report(&self) -> HealthReport {
        let entries = self
            .snapshot_components()
            .iter()
            .filter_map(|c| self.component(c.name()))
            .collect();
        HealthReporter::build(entries)
    }

    pub fn alerts(&self) -> Vec<DegradationAlert> {
        evaluate_alerts(&self.tracker())
    }

    /// Evaluate alerts and log the ones not reported yet at their level.
    /// Returns the current alert set.
    pub fn raise_alerts(&self) -> Vec<DegradationAlert> {
        let alerts = self.alerts();
        let mut raised = self.raised.lock().unwrap_or_else(|e| e.into_inner());
        raised.retain(|(component, _)| alerts.iter().any(|a| &a.component == component));
        for alert in &alerts {
            let known = raised
                .iter()
                .any(|(c, level)| c == &alert.component && *level >= alert.level);
            if known {
                continue;
            }
            events::degradation_alert(
                &alert.component,
                alert.level == AlertLevel::Critical,
                &alert.message,
            );
            raised.retain(|(c, _)| c != &alert.component);
            raised.push((alert.component.clone(), alert.level));
        }
        alerts
    }

    pub fn active_degradations(&self) -> Vec<TrackedDegradation> {
        self.tracker()
            .active_degradations()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Poll every `check_interval_secs` until cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let period = Duration::from_secs(self.config.check_interval_secs);
        run_periodic("health_monitor", period, cancel, || {
            let monitor = self.clone();
            async move {
                monitor.check_all().await;
                monitor.raise_alerts();
            }
        })
        .await;
    }
}

async fn probe_with_timeout(component: &dyn HealthCheckable, timeout: Duration) -> ProbeResult {
    match tokio::time::timeout(timeout, component.probe()).await {
        Ok(result) => result,
        Err(_) => ProbeResult::unhealthy(format!(
            "probe timed out after {}s",
            timeout.as_secs()
        )),
    }
}
