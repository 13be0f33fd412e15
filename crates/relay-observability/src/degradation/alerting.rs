//! Flapping and prolonged-outage alerts over the degradation history.

use std::collections::BTreeSet;

use chrono::Duration;
use relay_core::constants::{DEGRADATION_CRITICAL_HOURS, DEGRADATION_WARNING_PER_HOUR};
use serde::{Deserialize, Serialize};

use super::tracker::DegradationTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    None,
    /// The component keeps going unhealthy.
    Warning,
    /// The component has not come back for a long time.
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradationAlert {
    pub level: AlertLevel,
    pub component: String,
    pub message: String,
}

/// One alert per affected component, the most severe that applies, in
/// component name order.
pub fn evaluate_alerts(tracker: &DegradationTracker) -> Vec<DegradationAlert> {
    let components: BTreeSet<&str> = tracker
        .events()
        .iter()
        .map(|t| t.event.component.as_str())
        .collect();
    components
        .into_iter()
        .filter_map(|component| alert_for(tracker, component))
        .collect()
}

fn alert_for(tracker: &DegradationTracker, component: &str) -> Option<DegradationAlert> {
    let outage = tracker
        .degraded_duration(component)
        .filter(|d| *d > Duration::hours(DEGRADATION_CRITICAL_HOURS));
    if let Some(outage) = outage {
        return Some(DegradationAlert {
            level: AlertLevel::Critical,
            component: component.to_string(),
            message: format!("{component} unhealthy for {}h", outage.num_hours()),
        });
    }

    let flaps = tracker.count_recent(component, Duration::hours(1));
    (flaps > DEGRADATION_WARNING_PER_HOUR).then(|| DegradationAlert {
        level: AlertLevel::Warning,
        component: component.to_string(),
        message: format!("{component} went unhealthy {flaps} times in the last hour"),
    })
}
