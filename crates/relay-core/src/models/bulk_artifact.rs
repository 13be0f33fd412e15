use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Destination folder of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactCategory {
    Telemetry,
    Thermal,
    Visual,
    Videos,
}

impl ArtifactCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactCategory::Telemetry => "telemetry",
            ArtifactCategory::Thermal => "thermal",
            ArtifactCategory::Visual => "visual",
            ArtifactCategory::Videos => "videos",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "telemetry" => Some(ArtifactCategory::Telemetry),
            "thermal" => Some(ArtifactCategory::Thermal),
            "visual" => Some(ArtifactCategory::Visual),
            "videos" | "video" => Some(ArtifactCategory::Videos),
            _ => None,
        }
    }

    /// Guess the category from the file name.
    pub fn infer(path: &Path) -> Self {
        let ext = extension(path);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "mp4" | "avi" | "mkv" | "h264" | "mov" => ArtifactCategory::Videos,
            "json" | "csv" | "ndjson" => ArtifactCategory::Telemetry,
            "npy" | "raw" | "tiff" => ArtifactCategory::Thermal,
            _ if name.contains("thermal") => ArtifactCategory::Thermal,
            _ => ArtifactCategory::Visual,
        }
    }
}

/// MIME type from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match extension(path).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "tiff" => "image/tiff",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "json" => "application/json",
        "ndjson" => "application/x-ndjson",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Upload status. Successful uploads are removed from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Pending,
    InFlight,
    Failed,
    Evicted,
}

impl ArtifactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactStatus::Pending => "pending",
            ArtifactStatus::InFlight => "in_flight",
            ArtifactStatus::Failed => "failed",
            ArtifactStatus::Evicted => "evicted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ArtifactStatus::Pending),
            "in_flight" => Some(ArtifactStatus::InFlight),
            "failed" => Some(ArtifactStatus::Failed),
            "evicted" => Some(ArtifactStatus::Evicted),
            _ => None,
        }
    }
}

/// An artifact as handed over by a producer.
#[derive(Debug, Clone)]
pub struct NewBulkArtifact {
    pub path: PathBuf,
    pub destination_key: String,
    pub content_type: String,
    pub category: ArtifactCategory,
    pub priority: bool,
}

impl NewBulkArtifact {
    /// Content type and category are inferred from the file name.
    pub fn new(path: impl Into<PathBuf>, destination_key: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            content_type: content_type_for(&path).to_string(),
            category: ArtifactCategory::infer(&path),
            destination_key: destination_key.into(),
            path,
            priority: false,
        }
    }

    pub fn with_category(mut self, category: ArtifactCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }
}

/// A queued reference to a file awaiting upload. The file itself is owned
/// by the storage collaborator and never deleted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkArtifact {
    pub id: i64,
    pub path: PathBuf,
    pub destination_key: String,
    pub content_type: String,
    pub category: ArtifactCategory,
    pub priority: bool,
    pub status: ArtifactStatus,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
