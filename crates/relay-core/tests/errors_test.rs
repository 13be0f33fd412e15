use relay_core::errors::*;

#[test]
fn storage_error_messages_include_fields() {
    let err = StorageError::MigrationFailed {
        version: 2,
        reason: "disk full".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains('2'));
    assert!(msg.contains("disk full"));
}

#[test]
fn from_conversions_wrap_into_relay_error() {
    let err: RelayError = NetworkError::Transient {
        reason: "reset".into(),
    }
    .into();
    assert!(matches!(err, RelayError::NetworkError(_)));

    let err: RelayError = StorageError::Unwritable {
        reason: "read-only fs".into(),
    }
    .into();
    assert!(err.to_string().contains("read-only fs"));
}

#[test]
fn errors_map_onto_retry_taxonomy() {
    let transient: RelayError = NetworkError::ConnectTimeout { timeout_secs: 10 }.into();
    assert_eq!(transient.class(), ErrorClass::Transient);
    assert!(transient.is_retryable());

    let auth: RelayError = AuthError::PermanentAuth {
        reason: "certificate revoked".into(),
    }
    .into();
    assert_eq!(auth.class(), ErrorClass::PermanentAuth);
    assert!(!auth.is_retryable());

    let storage: RelayError = StorageError::SqliteError {
        message: "locked".into(),
    }
    .into();
    assert_eq!(storage.class(), ErrorClass::Storage);

    let capacity: RelayError = CapacityError::CapacityExceeded {
        resource: "queue".into(),
        used: 101,
        limit: 100,
    }
    .into();
    assert_eq!(capacity.class(), ErrorClass::Capacity);

    let rejected: RelayError = NetworkError::Rejected {
        status: 413,
        body: "too large".into(),
    }
    .into();
    assert_eq!(rejected.class(), ErrorClass::Permanent);

    let missing: RelayError = BulkError::SourceMissing {
        path: "/data/a.jpg".into(),
    }
    .into();
    assert_eq!(missing.class(), ErrorClass::Permanent);
}

#[test]
fn health_errors_wrap_as_transient() {
    let err: RelayError = HealthError::RecoveryFailed {
        component: "sensor_bus".into(),
        reason: "reinitialize failed".into(),
    }
    .into();
    assert!(matches!(err, RelayError::HealthError(_)));
    assert!(err.to_string().contains("sensor_bus"));
    assert_eq!(err.class(), ErrorClass::Transient);
}
