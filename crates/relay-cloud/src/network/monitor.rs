use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use relay_core::config::NetworkConfig;
use relay_core::schedule::{run_periodic, CancellationToken};
use relay_core::traits::ReachabilityProbe;
use relay_observability::events;

use super::interfaces::{read_operstate, SYSFS_NET};
use crate::connection::ConnectionManager;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub reachable: bool,
    /// Link state per configured interface; absent when unknown.
    pub interfaces: BTreeMap<String, bool>,
    pub last_check: Option<DateTime<Utc>>,
    pub transitions: u64,
}

/// Periodic reachability probe. On unreachable -> reachable it tells the
/// ConnectionManager to reconnect immediately instead of waiting out its
/// backoff.
pub struct NetworkMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    config: NetworkConfig,
    connection: Option<Arc<ConnectionManager>>,
    sysfs_root: PathBuf,
    reachable: watch::Sender<bool>,
    status: Mutex<NetworkStatus>,
}

impl NetworkMonitor {
    pub fn new(probe: Arc<dyn ReachabilityProbe>, config: NetworkConfig) -> Self {
        let (reachable, _) = watch::channel(false);
        Self {
            probe,
            config,
            connection: None,
            sysfs_root: PathBuf::from(SYSFS_NET),
            reachable,
            status: Mutex::new(NetworkStatus::default()),
        }
    }

    pub fn with_connection(mut self, connection: Arc<ConnectionManager>) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    /// Reachability signal for the DeliveryEngine and BulkUploader.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.reachable.subscribe()
    }

    pub fn is_reachable(&self) -> bool {
        *self.reachable.borrow()
    }

    pub fn status(&self) -> NetworkStatus {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Probe once and publish the result. Returns the new reachability.
    pub async fn check_once(&self) -> bool {
        let reachable = self.probe.is_reachable().await;
        let interfaces: BTreeMap<String, bool> = self
            .config
            .interfaces
            .iter()
            .filter_map(|name| {
                read_operstate(&self.sysfs_root, name).map(|up| (name.clone(), up))
            })
            .collect();

        let was = self.reachable.send_replace(reachable);
        let transitions = {
            let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
            let first = status.last_check.is_none();
            if was != reachable && !first {
                status.transitions += 1;
            }
            status.reachable = reachable;
            status.interfaces = interfaces;
            status.last_check = Some(Utc::now());
            (was != reachable && !first).then_some(status.transitions)
        };

        if let Some(transitions) = transitions {
            events::network_transition(reachable, transitions);
        }
        if reachable && !was {
            if let Some(connection) = &self.connection {
                connection.notify_reachable();
            }
        }
        reachable
    }

    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let period = Duration::from_secs(self.config.check_interval_secs);
        run_periodic("network_monitor", period, cancel, move || {
            let this = self.clone();
            async move {
                this.check_once().await;
            }
        })
        .await;
    }
}
