use serde::{Deserialize, Serialize};

/// Snapshot of the DurableQueue by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub in_flight: u64,
    pub sent: u64,
    pub failed: u64,
    pub dead: u64,
    pub evicted: u64,
    /// Payload bytes still awaiting delivery.
    pub pending_bytes: u64,
}

impl QueueStats {
    /// Records that still need delivery (pending, in flight, or retrying).
    pub fn depth(&self) -> u64 {
        self.pending + self.in_flight + self.failed
    }

    pub fn total(&self) -> u64 {
        self.pending + self.in_flight + self.sent + self.failed + self.dead + self.evicted
    }
}

/// Snapshot of the bulk artifact queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactQueueStats {
    pub pending: u64,
    pub in_flight: u64,
    pub failed: u64,
    pub evicted: u64,
}

/// Result of an emergency storage cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub files_deleted: u64,
    pub bytes_from_files: u64,
    pub records_evicted: u64,
    pub bytes_from_records: u64,
}

impl CleanupReport {
    pub fn bytes_freed(&self) -> u64 {
        self.bytes_from_files + self.bytes_from_records
    }
}
