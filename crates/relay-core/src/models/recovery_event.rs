use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    Reinitialize,
    EmergencyCleanup,
    ForceReconnect,
    None,
}

impl RecoveryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryAction::Reinitialize => "reinitialize",
            RecoveryAction::EmergencyCleanup => "emergency_cleanup",
            RecoveryAction::ForceReconnect => "force_reconnect",
            RecoveryAction::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reinitialize" => Some(RecoveryAction::Reinitialize),
            "emergency_cleanup" => Some(RecoveryAction::EmergencyCleanup),
            "force_reconnect" => Some(RecoveryAction::ForceReconnect),
            "none" => Some(RecoveryAction::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryOutcome {
    Succeeded,
    Failed,
    /// Inside the cooldown window; no action taken.
    Suppressed,
}

impl RecoveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryOutcome::Succeeded => "succeeded",
            RecoveryOutcome::Failed => "failed",
            RecoveryOutcome::Suppressed => "suppressed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "succeeded" => Some(RecoveryOutcome::Succeeded),
            "failed" => Some(RecoveryOutcome::Failed),
            "suppressed" => Some(RecoveryOutcome::Suppressed),
            _ => None,
        }
    }
}

/// Append-only audit record of a recovery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryEvent {
    pub component: String,
    pub action: RecoveryAction,
    pub timestamp: DateTime<Utc>,
    pub outcome: RecoveryOutcome,
    pub detail: Option<String>,
}

impl RecoveryEvent {
    pub fn new(
        component: impl Into<String>,
        action: RecoveryAction,
        outcome: RecoveryOutcome,
        detail: Option<String>,
    ) -> Self {
        Self {
            component: component.into(),
            action,
            timestamp: Utc::now(),
            outcome,
            detail,
        }
    }

    /// True when an action was actually executed.
    pub fn executed(&self) -> bool {
        self.outcome != RecoveryOutcome::Suppressed
    }
}
