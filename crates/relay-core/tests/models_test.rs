use std::path::Path;

use relay_core::models::*;

#[test]
fn topic_parsing_and_priority() {
    assert_eq!(Topic::from("telemetry"), Topic::Telemetry);
    assert_eq!(Topic::from("alert"), Topic::Alerts);
    assert_eq!(Topic::from("alerts").priority(), Priority::Alert);
    assert_eq!(Topic::from("heartbeat").priority(), Priority::Normal);
    assert_eq!(Topic::Heartbeat.qos(), 0);
    assert_eq!(Topic::Telemetry.qos(), 1);
    assert_eq!(Topic::from("events").as_str(), "events");
}

#[test]
fn record_status_round_trips_through_strings() {
    for status in [
        RecordStatus::Pending,
        RecordStatus::InFlight,
        RecordStatus::Sent,
        RecordStatus::Failed,
        RecordStatus::Dead,
        RecordStatus::Evicted,
    ] {
        assert_eq!(RecordStatus::parse(status.as_str()), Some(status));
    }
    assert!(RecordStatus::Dead.is_terminal());
    assert!(!RecordStatus::Failed.is_terminal());
}

#[test]
fn priority_orders_alerts_first() {
    assert!(Priority::Alert > Priority::Normal);
    assert_eq!(Priority::from_i64(Priority::Alert.as_i64()), Priority::Alert);
}

#[test]
fn artifact_category_and_content_type_inference() {
    assert_eq!(
        ArtifactCategory::infer(Path::new("/data/videos/motion_0930.mp4")),
        ArtifactCategory::Videos
    );
    assert_eq!(
        ArtifactCategory::infer(Path::new("/data/images/thermal_0930.png")),
        ArtifactCategory::Thermal
    );
    assert_eq!(
        ArtifactCategory::infer(Path::new("/data/images/snapshot.jpg")),
        ArtifactCategory::Visual
    );
    assert_eq!(
        ArtifactCategory::infer(Path::new("/data/readings.csv")),
        ArtifactCategory::Telemetry
    );
    assert_eq!(content_type_for(Path::new("a.JPG")), "image/jpeg");
    assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");

    let artifact = NewBulkArtifact::new("/data/clip.mp4", "site/2024-01-01/videos/clip.mp4")
        .with_priority(true);
    assert_eq!(artifact.content_type, "video/mp4");
    assert_eq!(artifact.category, ArtifactCategory::Videos);
    assert!(artifact.priority);
}

#[test]
fn recovery_event_serializes_snake_case() {
    let event = RecoveryEvent::new(
        "thermal_camera",
        RecoveryAction::Reinitialize,
        RecoveryOutcome::Succeeded,
        None,
    );
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"reinitialize\""));
    assert!(json.contains("\"succeeded\""));
    assert!(event.executed());

    let suppressed =
        RecoveryEvent::new("disk", RecoveryAction::None, RecoveryOutcome::Suppressed, None);
    assert!(!suppressed.executed());
}

#[test]
fn queue_stats_depth_counts_unfinished_work() {
    let stats = QueueStats {
        pending: 3,
        in_flight: 1,
        failed: 2,
        sent: 10,
        dead: 1,
        evicted: 4,
        pending_bytes: 0,
    };
    assert_eq!(stats.depth(), 6);
    assert_eq!(stats.total(), 21);
}
