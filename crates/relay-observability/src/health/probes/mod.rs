//! Built-in probes for host resources.

mod disk;
mod host;
mod memory;
mod thermal;

pub use disk::DiskProbe;
pub use host::HostSnapshot;
pub use memory::MemoryProbe;
pub use thermal::{read_cpu_temperature, CpuTemperatureProbe};
