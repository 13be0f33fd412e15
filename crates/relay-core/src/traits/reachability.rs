use async_trait::async_trait;

/// Lightweight check that the outside world can be reached.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}
