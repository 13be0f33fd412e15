use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use relay_core::errors::{BulkError, RelayError, RelayResult};
use relay_core::traits::ObjectStore;

use super::keys::validate_key;
use crate::transport::classify_status;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Object store accepting `PUT <base_url>/<key>`. The object only becomes
/// visible once the request body has been received in full.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
}

impl HttpObjectStore {
    pub fn new(base_url: &str) -> RelayResult<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| RelayError::ConfigError(format!("object store client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn put_file(&self, key: &str, source: &Path, content_type: &str) -> RelayResult<u64> {
        validate_key(key)?;
        let body = match tokio::fs::read(source).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BulkError::SourceMissing {
                    path: source.display().to_string(),
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        };
        let len = body.len() as u64;

        let resp = self
            .client
            .put(self.object_url(key))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| BulkError::UploadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            classify_status(status, &text)?;
        }
        Ok(len)
    }
}
