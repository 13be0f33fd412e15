mod broker_transport;
mod connection_control;
mod health_checkable;
mod object_store;
mod reachability;
mod recovery_journal;
mod storage_cleanup;

pub use broker_transport::{BrokerTransport, OutboundMessage};
pub use connection_control::ConnectionControl;
pub use health_checkable::HealthCheckable;
pub use object_store::ObjectStore;
pub use reachability::ReachabilityProbe;
pub use recovery_journal::RecoveryJournal;
pub use storage_cleanup::StorageCleanup;
