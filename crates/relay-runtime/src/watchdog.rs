//! Hardware watchdog petting.
//!
//! Opening the device arms the board timer; every pet resets it. If the
//! process hangs and the loop stops petting, the board reboots. Hosts
//! without a watchdog (or without permission to open it) run unguarded.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use relay_core::config::WatchdogConfig;
use relay_core::errors::RelayResult;
use relay_core::schedule::{run_periodic, CancellationToken};

/// Written before close so the kernel driver disarms the timer.
const MAGIC_CLOSE: &[u8] = b"V";

enum Device {
    Closed,
    Open(File),
    /// Missing or not ours to open. Never retried.
    Unavailable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogStats {
    pub enabled: bool,
    /// The device is open and being petted.
    pub armed: bool,
    pub pets: u64,
}

pub struct Watchdog {
    path: PathBuf,
    interval: Duration,
    enabled: bool,
    device: Mutex<Device>,
    pets: AtomicU64,
}

impl Watchdog {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
            enabled: true,
            device: Mutex::new(Device::Closed),
            pets: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &WatchdogConfig) -> Self {
        Self {
            enabled: config.enabled,
            ..Self::new(&config.device_path, Duration::from_secs(config.interval_secs))
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn device(&self) -> MutexGuard<'_, Device> {
        self.device.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reset the board timer, opening the device on first use.
    ///
    /// Returns `Ok(false)` when the device is unavailable. A failed write
    /// closes the handle so the next pet reopens it.
    pub fn pet(&self) -> RelayResult<bool> {
        let mut device = self.device();
        if matches!(*device, Device::Unavailable) {
            return Ok(false);
        }
        if matches!(*device, Device::Closed) {
            match OpenOptions::new().write(true).open(&self.path) {
                Ok(file) => {
                    tracing::info!(device = %self.path.display(), "watchdog: armed");
                    *device = Device::Open(file);
                }
                Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                    tracing::warn!(
                        device = %self.path.display(),
                        error = %e,
                        "watchdog: device unavailable, running without it"
                    );
                    *device = Device::Unavailable;
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let Device::Open(file) = &mut *device else {
            return Ok(false);
        };
        if let Err(e) = file.write_all(b"1").and_then(|()| file.flush()) {
            *device = Device::Closed;
            return Err(e.into());
        }
        self.pets.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    /// Disarm and release the device. Safe to call when never opened.
    pub fn close(&self) {
        let mut device = self.device();
        if let Device::Open(file) = &mut *device {
            match file.write_all(MAGIC_CLOSE).and_then(|()| file.flush()) {
                Ok(()) => tracing::info!(device = %self.path.display(), "watchdog: disarmed"),
                Err(e) => tracing::warn!(error = %e, "watchdog: magic close failed, timer stays armed"),
            }
            *device = Device::Closed;
        }
    }

    pub fn stats(&self) -> WatchdogStats {
        WatchdogStats {
            enabled: self.enabled,
            armed: matches!(*self.device(), Device::Open(_)),
            pets: self.pets.load(Ordering::Relaxed),
        }
    }

    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        run_periodic("watchdog", self.interval, cancel, || {
            let this = self.clone();
            async move {
                if let Err(e) = this.pet() {
                    tracing::error!(device = %this.path.display(), error = %e, "watchdog: pet failed");
                }
            }
        })
        .await;
    }
}
