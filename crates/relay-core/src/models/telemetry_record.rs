use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{TOPIC_ALERTS, TOPIC_HEARTBEAT, TOPIC_TELEMETRY};

/// Delivery status of a queued record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Waiting for a drain cycle.
    Pending,
    /// Claimed by a drain cycle; invisible to other drains.
    InFlight,
    /// Broker acknowledged the publish.
    Sent,
    /// Last attempt failed; eligible again after `next_attempt_at`.
    Failed,
    /// Attempt cap reached. Held for inspection, never retried.
    Dead,
    /// Dropped by the capacity policy or emergency cleanup.
    Evicted,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::InFlight => "in_flight",
            RecordStatus::Sent => "sent",
            RecordStatus::Failed => "failed",
            RecordStatus::Dead => "dead",
            RecordStatus::Evicted => "evicted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RecordStatus::Pending),
            "in_flight" => Some(RecordStatus::InFlight),
            "sent" => Some(RecordStatus::Sent),
            "failed" => Some(RecordStatus::Failed),
            "dead" => Some(RecordStatus::Dead),
            "evicted" => Some(RecordStatus::Evicted),
            _ => None,
        }
    }

    /// Terminal statuses are never picked up by a drain again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecordStatus::Sent | RecordStatus::Dead | RecordStatus::Evicted
        )
    }
}

/// Two drain tiers. Alerts always go first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    Alert,
}

impl Priority {
    pub fn as_i64(&self) -> i64 {
        match self {
            Priority::Normal => 0,
            Priority::Alert => 1,
        }
    }

    pub fn from_i64(v: i64) -> Self {
        if v > 0 {
            Priority::Alert
        } else {
            Priority::Normal
        }
    }
}

/// Logical topic of a record. The broker topic is derived from it per site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Telemetry,
    Heartbeat,
    Alerts,
    Other(String),
}

impl Topic {
    pub fn as_str(&self) -> &str {
        match self {
            Topic::Telemetry => TOPIC_TELEMETRY,
            Topic::Heartbeat => TOPIC_HEARTBEAT,
            Topic::Alerts => TOPIC_ALERTS,
            Topic::Other(s) => s,
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            Topic::Alerts => Priority::Alert,
            _ => Priority::Normal,
        }
    }

    /// Broker QoS level: heartbeats are fire-and-forget.
    pub fn qos(&self) -> u8 {
        match self {
            Topic::Heartbeat => 0,
            _ => 1,
        }
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        match s {
            TOPIC_TELEMETRY => Topic::Telemetry,
            TOPIC_HEARTBEAT => Topic::Heartbeat,
            TOPIC_ALERTS | "alert" => Topic::Alerts,
            other => Topic::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record as handed over by a producer, before it has an id.
#[derive(Debug, Clone)]
pub struct NewTelemetryRecord {
    pub message_id: Uuid,
    pub topic: Topic,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl NewTelemetryRecord {
    pub fn new(topic: Topic, payload: Vec<u8>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            topic,
            payload,
            created_at: Utc::now(),
        }
    }
}

/// One unit of queued work, owned by the DurableQueue until sent or dead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub id: i64,
    /// Stable id sent with every attempt so consumers can deduplicate.
    pub message_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub topic: Topic,
    pub priority: Priority,
    pub payload: Vec<u8>,
    pub status: RecordStatus,
    pub attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
