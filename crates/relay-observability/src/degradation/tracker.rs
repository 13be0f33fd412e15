//! Record every unhealthy transition: component, failure, timestamp, and
//! whether the component has come back.

use chrono::{DateTime, Duration, Utc};
use relay_core::models::DegradationEvent;
use serde::{Deserialize, Serialize};

/// Recovery status of a degradation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryStatus {
    /// Still degraded.
    Active,
    /// Back to healthy.
    Recovered,
}

/// A tracked degradation event with recovery status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedDegradation {
    pub event: DegradationEvent,
    pub recovery_status: RecoveryStatus,
    pub recovered_at: Option<DateTime<Utc>>,
}

/// Bounded history of degradations, oldest dropped first.
#[derive(Debug, Clone)]
pub struct DegradationTracker {
    events: Vec<TrackedDegradation>,
    capacity: usize,
}

impl Default for DegradationTracker {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

impl DegradationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record a new degradation.
    pub fn record(&mut self, event: DegradationEvent) {
        if self.events.len() >= self.capacity {
            // Keep active entries; they still drive the critical alert.
            if let Some(pos) = self
                .events
                .iter()
                .position(|t| t.recovery_status == RecoveryStatus::Recovered)
            {
                self.events.remove(pos);
            } else {
                self.events.remove(0);
            }
        }
        self.events.push(TrackedDegradation {
            event,
            recovery_status: RecoveryStatus::Active,
            recovered_at: None,
        });
    }

    /// Mark every active degradation of `component` as recovered.
    pub fn mark_recovered(&mut self, component: &str) {
        let now = Utc::now();
        for tracked in self.events.iter_mut() {
            if tracked.event.component == component
                && tracked.recovery_status == RecoveryStatus::Active
            {
                tracked.recovery_status = RecoveryStatus::Recovered;
                tracked.recovered_at = Some(now);
            }
        }
    }

    pub fn events(&self) -> &[TrackedDegradation] {
        &self.events
    }

    /// Get active (unrecovered) degradations.
    pub fn active_degradations(&self) -> Vec<&TrackedDegradation> {
        self.events
            .iter()
            .filter(|t| t.recovery_status == RecoveryStatus::Active)
            .collect()
    }

    /// Count events in the last `window` for a given component.
    pub fn count_recent(&self, component: &str, window: Duration) -> usize {
        let cutoff = Utc::now() - window;
        self.events
            .iter()
            .filter(|t| t.event.component == component && t.event.timestamp > cutoff)
            .count()
    }

    /// How long a component has been continuously degraded, or None if it is not.
    pub fn degraded_duration(&self, component: &str) -> Option<Duration> {
        let earliest = self
            .events
            .iter()
            .filter(|t| {
                t.event.component == component && t.recovery_status == RecoveryStatus::Active
            })
            .map(|t| t.event.timestamp)
            .min()?;
        Some(Utc::now() - earliest)
    }
}
