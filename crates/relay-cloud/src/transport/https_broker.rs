//! Broker publishes over HTTPS with mutual TLS.
//!
//! Each publish is `POST https://<endpoint>:<port>/topics/<topic>?qos=<n>`
//! authenticated by the device certificate. Status codes are mapped onto
//! the error taxonomy so callers never inspect HTTP details.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity, StatusCode};

use relay_core::config::BrokerConfig;
use relay_core::constants::MESSAGE_ID_HEADER;
use relay_core::errors::{AuthError, NetworkError, RelayError, RelayResult};
use relay_core::traits::{BrokerTransport, OutboundMessage};

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Map a broker response status onto the error taxonomy.
pub fn classify_status(status: StatusCode, body: &str) -> RelayResult<()> {
    if status.is_success() {
        return Ok(());
    }
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::PermanentAuth {
            reason: format!("HTTP {status}: {body}"),
        }
        .into()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            Err(NetworkError::Transient {
                reason: format!("HTTP {status}"),
            }
            .into())
        }
        s if s.is_client_error() => Err(NetworkError::Rejected {
            status: s.as_u16(),
            body,
        }
        .into()),
        s => Err(NetworkError::Transient {
            reason: format!("HTTP {s}"),
        }
        .into()),
    }
}

/// Map a request that never got a response.
pub fn classify_send_error(e: &reqwest::Error) -> RelayError {
    if e.is_connect() {
        NetworkError::Unreachable {
            reason: e.to_string(),
        }
        .into()
    } else {
        NetworkError::Transient {
            reason: e.to_string(),
        }
        .into()
    }
}

fn read_credential(path: &str) -> RelayResult<Vec<u8>> {
    std::fs::read(Path::new(path)).map_err(|e| {
        AuthError::CredentialsMissing {
            path: path.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Mutual-TLS HTTPS publisher for the cloud broker.
#[derive(Debug)]
pub struct HttpsBrokerTransport {
    client: Client,
    base_url: String,
    client_id: String,
}

impl HttpsBrokerTransport {
    /// Build the TLS client from the certificate, key, and root CA on disk.
    /// A missing or malformed credential file is a permanent auth error.
    pub fn from_config(config: &BrokerConfig, client_id: impl Into<String>) -> RelayResult<Self> {
        let mut identity_pem = read_credential(&config.cert_path)?;
        identity_pem.push(b'\n');
        identity_pem.extend(read_credential(&config.key_path)?);
        let root_pem = read_credential(&config.root_ca_path)?;

        let identity = Identity::from_pem(&identity_pem).map_err(|e| AuthError::PermanentAuth {
            reason: format!("invalid device certificate or key: {e}"),
        })?;
        let root = Certificate::from_pem(&root_pem).map_err(|e| AuthError::PermanentAuth {
            reason: format!("invalid root CA: {e}"),
        })?;

        let client = Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .add_root_certificate(root)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.operation_timeout_secs))
            .gzip(true)
            .build()
            .map_err(|e| RelayError::ConfigError(format!("https client: {e}")))?;

        Ok(Self::with_client(
            client,
            format!("https://{}:{}", config.endpoint, config.port),
            client_id,
        ))
    }

    /// Use a prebuilt client, e.g. one pointed at a plain-HTTP test broker.
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn publish_url(&self, message: &OutboundMessage) -> String {
        format!(
            "{}/topics/{}?qos={}",
            self.base_url, message.topic, message.qos
        )
    }
}

#[async_trait]
impl BrokerTransport for HttpsBrokerTransport {
    /// The TLS handshake happens here; a rejected certificate surfaces as
    /// `PermanentAuth` instead of on the first publish.
    async fn connect(&self) -> RelayResult<()> {
        let resp = self
            .client
            .get(&self.base_url)
            .header("x-relay-client-id", &self.client_id)
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;
        let status = resp.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = resp.text().await.unwrap_or_default();
                classify_status(status, &body)
            }
            s if s.is_server_error() => classify_status(s, ""),
            // Any other answer proves the session is usable.
            _ => {
                tracing::info!(endpoint = %self.base_url, client_id = %self.client_id, "broker: connected");
                Ok(())
            }
        }
    }

    async fn publish(&self, message: &OutboundMessage) -> RelayResult<()> {
        let mut req = self
            .client
            .post(self.publish_url(message))
            .header(MESSAGE_ID_HEADER, message.message_id.to_string())
            .header("x-relay-client-id", &self.client_id)
            .body(message.payload.clone());
        if let Some(encoding) = message.content_encoding {
            req = req.header(reqwest::header::CONTENT_ENCODING, encoding);
        }

        let resp = req.send().await.map_err(|e| classify_send_error(&e))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        classify_status(status, &body)
    }

    async fn disconnect(&self) -> RelayResult<()> {
        // HTTPS keeps no broker-side session; pooled connections close on drop.
        tracing::debug!(endpoint = %self.base_url, "broker: session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::errors::ErrorClass;

    #[test]
    fn success_statuses_pass() {
        assert!(classify_status(StatusCode::OK, "").is_ok());
        assert!(classify_status(StatusCode::ACCEPTED, "").is_ok());
    }

    #[test]
    fn auth_statuses_are_permanent_auth() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = classify_status(status, "bad cert").unwrap_err();
            assert_eq!(err.class(), ErrorClass::PermanentAuth);
        }
    }

    #[test]
    fn bad_request_is_rejected_permanently() {
        let err = classify_status(StatusCode::PAYLOAD_TOO_LARGE, "too big").unwrap_err();
        assert_eq!(err.class(), ErrorClass::Permanent);
        assert!(err.to_string().contains("413"));
    }

    #[test]
    fn server_errors_and_throttling_are_transient() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::TOO_MANY_REQUESTS,
        ] {
            let err = classify_status(status, "").unwrap_err();
            assert_eq!(err.class(), ErrorClass::Transient, "{status}");
        }
    }

    #[test]
    fn missing_credentials_fail_construction() {
        let config = BrokerConfig {
            endpoint: "broker.invalid".into(),
            cert_path: "/nonexistent/certificate.pem.crt".into(),
            ..Default::default()
        };
        let err = HttpsBrokerTransport::from_config(&config, "relay-test").unwrap_err();
        assert_eq!(err.class(), ErrorClass::PermanentAuth);
        assert!(err.to_string().contains("certificate.pem.crt"));
    }

    #[test]
    fn publish_url_carries_topic_and_qos() {
        let transport =
            HttpsBrokerTransport::with_client(Client::new(), "https://broker:8443/", "c1");
        let msg = OutboundMessage {
            topic: "relay/site-1/telemetry".into(),
            payload: vec![],
            qos: 1,
            message_id: uuid::Uuid::new_v4(),
            content_encoding: None,
        };
        assert_eq!(
            transport.publish_url(&msg),
            "https://broker:8443/topics/relay/site-1/telemetry?qos=1"
        );
    }
}
