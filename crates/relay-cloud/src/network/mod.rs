//! NetworkMonitor: reachability probing and the reconnect signal.

mod interfaces;
mod monitor;
mod probe;

pub use interfaces::{read_operstate, SYSFS_NET};
pub use monitor::{NetworkMonitor, NetworkStatus};
pub use probe::TcpProbe;
