use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use relay_core::models::{ConnectionState, ProbeResult, RecoveryKind};
use relay_core::traits::HealthCheckable;
use relay_storage::DurableQueue;

use crate::connection::ConnectionManager;

/// Health of the delivery path. Unhealthy when the network is up but the
/// broker session is not, or when the queue medium has been lost.
pub struct DeliveryHealth {
    connection: Arc<ConnectionManager>,
    queue: Arc<DurableQueue>,
    reachability: watch::Receiver<bool>,
}

impl DeliveryHealth {
    pub fn new(
        connection: Arc<ConnectionManager>,
        queue: Arc<DurableQueue>,
        reachability: watch::Receiver<bool>,
    ) -> Self {
        Self {
            connection,
            queue,
            reachability,
        }
    }
}

#[async_trait]
impl HealthCheckable for DeliveryHealth {
    fn name(&self) -> &str {
        "delivery"
    }

    fn recovery_kind(&self) -> RecoveryKind {
        RecoveryKind::Delivery
    }

    async fn probe(&self) -> ProbeResult {
        if self.queue.is_fatal() {
            return ProbeResult::unhealthy(format!(
                "queue storage failed {} times in a row",
                self.queue.consecutive_storage_failures()
            ));
        }
        let reachable = *self.reachability.borrow();
        let state = self.connection.state();
        match (reachable, state) {
            (_, ConnectionState::Connected) => ProbeResult::healthy(),
            (false, state) => ProbeResult::healthy_with(format!("offline ({state})")),
            (true, state) => {
                ProbeResult::unhealthy(format!("network reachable but broker session is {state}"))
            }
        }
    }
}
