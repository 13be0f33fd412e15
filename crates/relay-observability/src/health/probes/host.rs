use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sysinfo::System;

use super::disk::DiskProbe;
use super::memory::percent;
use super::thermal::read_cpu_temperature;

/// Point-in-time host metrics, reported in the heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostSnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub temperature_c: Option<f64>,
    pub uptime_secs: u64,
}

impl HostSnapshot {
    /// Blocking: samples CPU usage over a short window. Run it on a
    /// blocking thread.
    pub fn collect(disk_path: &Path, thermal_zone: &Path) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        std::thread::sleep(Duration::from_millis(200));
        sys.refresh_cpu();
        sys.refresh_memory();

        let disk_percent = DiskProbe::space_at(disk_path)
            .map(|(available, total)| percent(total.saturating_sub(available), total))
            .unwrap_or(0.0);

        Self {
            cpu_percent: f64::from(sys.global_cpu_info().cpu_usage()),
            memory_percent: percent(sys.used_memory(), sys.total_memory()),
            disk_percent,
            temperature_c: read_cpu_temperature(thermal_zone),
            uptime_secs: System::uptime(),
        }
    }
}
