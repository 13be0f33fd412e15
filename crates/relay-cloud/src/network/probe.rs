use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use relay_core::config::NetworkConfig;
use relay_core::traits::ReachabilityProbe;

/// Reachability by TCP connect to a well-known host, e.g. a public DNS
/// resolver on port 53.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(
            config.probe_host.clone(),
            config.probe_port,
            Duration::from_secs(config.probe_timeout_secs),
        )
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn is_reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(self.target())).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::trace!(target = %self.target(), error = %e, "network: probe refused");
                false
            }
            Err(_) => false,
        }
    }
}
