//! Structured log events for key operations.
//!
//! Each function emits a `tracing` event with an `event` field so log
//! pipelines can filter on it without parsing messages.

use relay_core::models::{ConnectionState, RecoveryAction, RecoveryOutcome};

/// Records dropped by the capacity policy or emergency cleanup.
pub fn record_evicted(count: u64, bytes: u64, reason: &str) {
    tracing::warn!(
        event = "record_evicted",
        evicted = count,
        bytes = bytes,
        reason = %reason,
        "records evicted"
    );
}

/// A record exhausted its attempts (or failed permanently).
pub fn record_dead_lettered(record_id: i64, error: &str) {
    tracing::warn!(
        event = "record_dead_lettered",
        record_id = record_id,
        error = %error,
        "record moved to dead-letter"
    );
}

pub fn connection_state_changed(from: ConnectionState, to: ConnectionState) {
    tracing::info!(
        event = "connection_state_changed",
        from = %from,
        to = %to,
        "broker connection state changed"
    );
}

/// A recovery action skipped because the component is still cooling down.
pub fn recovery_suppressed(component: &str, remaining_secs: i64) {
    tracing::warn!(
        event = "recovery_suppressed",
        component = %component,
        remaining_secs = remaining_secs,
        "recovery suppressed"
    );
}

pub fn recovery_executed(component: &str, action: RecoveryAction, outcome: RecoveryOutcome) {
    match outcome {
        RecoveryOutcome::Failed => tracing::error!(
            event = "recovery_executed",
            component = %component,
            action = action.as_str(),
            outcome = outcome.as_str(),
            "recovery action failed"
        ),
        _ => tracing::info!(
            event = "recovery_executed",
            component = %component,
            action = action.as_str(),
            outcome = outcome.as_str(),
            "recovery action executed"
        ),
    }
}

pub fn component_unhealthy(component: &str, consecutive_failures: u32, detail: &str) {
    tracing::warn!(
        event = "component_unhealthy",
        component = %component,
        consecutive_failures = consecutive_failures,
        detail = %detail,
        "component marked unhealthy"
    );
}

/// Still failing after a recovery attempt; recovery is requested again.
pub fn component_still_unhealthy(component: &str, consecutive_failures: u32, detail: &str) {
    tracing::warn!(
        event = "component_still_unhealthy",
        component = %component,
        consecutive_failures = consecutive_failures,
        detail = %detail,
        "component still unhealthy, retrying recovery"
    );
}

/// A degradation alert was raised or escalated.
pub fn degradation_alert(component: &str, critical: bool, message: &str) {
    if critical {
        tracing::error!(
            event = "degradation_alert",
            component = %component,
            level = "critical",
            "{message}"
        );
    } else {
        tracing::warn!(
            event = "degradation_alert",
            component = %component,
            level = "warning",
            "{message}"
        );
    }
}

pub fn component_recovered(component: &str) {
    tracing::info!(
        event = "component_recovered",
        component = %component,
        "component healthy again"
    );
}

/// A bulk artifact gave up for good.
pub fn artifact_failed(artifact_id: i64, key: &str, attempts: u32, error: &str) {
    tracing::warn!(
        event = "artifact_failed",
        artifact_id = artifact_id,
        key = %key,
        attempts = attempts,
        error = %error,
        "artifact upload failed permanently"
    );
}

pub fn emergency_cleanup(files_deleted: u64, bytes_from_files: u64, records_evicted: u64) {
    tracing::warn!(
        event = "emergency_cleanup",
        files_deleted = files_deleted,
        bytes_from_files = bytes_from_files,
        records_evicted = records_evicted,
        "emergency storage cleanup completed"
    );
}

pub fn network_transition(reachable: bool, transitions: u64) {
    if reachable {
        tracing::info!(
            event = "network_transition",
            reachable = true,
            transitions = transitions,
            "network reachable"
        );
    } else {
        tracing::warn!(
            event = "network_transition",
            reachable = false,
            transitions = transitions,
            "network unreachable"
        );
    }
}
