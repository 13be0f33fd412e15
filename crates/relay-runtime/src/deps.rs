use std::sync::Arc;

use relay_cloud::bulk::store_from_config;
use relay_cloud::{HttpsBrokerTransport, TcpProbe};
use relay_core::config::RelayConfig;
use relay_core::errors::RelayResult;
use relay_core::traits::{
    BrokerTransport, HealthCheckable, ObjectStore, ReachabilityProbe, StorageCleanup,
};
use relay_storage::DurableQueue;

/// Everything the runtime talks to outside its own process state.
pub struct RuntimeDeps {
    pub transport: Arc<dyn BrokerTransport>,
    pub object_store: Arc<dyn ObjectStore>,
    pub reachability: Arc<dyn ReachabilityProbe>,
    /// Application components (cameras, sensors) to monitor and recover.
    pub sensors: Vec<Arc<dyn HealthCheckable>>,
    /// Defaults to [`EmergencyCleanup`](crate::EmergencyCleanup) over the
    /// configured media roots.
    pub cleanup: Option<Arc<dyn StorageCleanup>>,
    /// Defaults to the queue file at `queue.db_path`.
    pub queue: Option<Arc<DurableQueue>>,
    /// Register the disk, memory, and CPU temperature probes.
    pub host_probes: bool,
}

impl RuntimeDeps {
    pub fn new(
        transport: Arc<dyn BrokerTransport>,
        object_store: Arc<dyn ObjectStore>,
        reachability: Arc<dyn ReachabilityProbe>,
    ) -> Self {
        Self {
            transport,
            object_store,
            reachability,
            sensors: Vec::new(),
            cleanup: None,
            queue: None,
            host_probes: true,
        }
    }

    /// HTTPS broker, configured object store, and TCP reachability probe.
    pub fn production(config: &RelayConfig) -> RelayResult<Self> {
        let transport = HttpsBrokerTransport::from_config(&config.broker, config.client_id())?;
        let object_store = store_from_config(&config.bulk.destination)?;
        let probe = TcpProbe::from_config(&config.network);
        Ok(Self::new(Arc::new(transport), object_store, Arc::new(probe)))
    }

    pub fn with_sensor(mut self, sensor: Arc<dyn HealthCheckable>) -> Self {
        self.sensors.push(sensor);
        self
    }

    pub fn with_cleanup(mut self, cleanup: Arc<dyn StorageCleanup>) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    pub fn with_queue(mut self, queue: Arc<DurableQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn without_host_probes(mut self) -> Self {
        self.host_probes = false;
        self
    }
}
