//! # relay-cloud
//!
//! Everything that talks to the outside world: the broker connection and
//! its backoff state machine, the DeliveryEngine that drains the durable
//! queue through it, the BulkUploader for large artifacts, the
//! NetworkMonitor that tells both when the link is back, and the HTTPS
//! transports behind them.

pub mod bulk;
pub mod connection;
pub mod delivery;
pub mod network;
pub mod transport;

pub use bulk::{BulkStats, BulkUploader, FilesystemStore, HttpObjectStore};
pub use connection::{Backoff, ConnectionManager, ConnectionStats};
pub use delivery::{DeliveryEngine, DeliveryHealth, DeliveryStats};
pub use network::{NetworkMonitor, NetworkStatus, TcpProbe};
pub use transport::HttpsBrokerTransport;
