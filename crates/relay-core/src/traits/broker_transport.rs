use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::RelayResult;

/// One publish, as handed to the transport.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Full broker topic.
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
    /// Same across retries of one record.
    pub message_id: Uuid,
    /// `Some("zstd")` when the payload was compressed.
    pub content_encoding: Option<&'static str>,
}

/// Secured connection to the cloud message broker.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    /// Establish (or verify) the session. Errors are classified with
    /// [`crate::errors::RelayError::class`].
    async fn connect(&self) -> RelayResult<()>;

    /// Publish one message. Returns once the broker has acknowledged it.
    async fn publish(&self, message: &OutboundMessage) -> RelayResult<()>;

    async fn disconnect(&self) -> RelayResult<()>;
}
