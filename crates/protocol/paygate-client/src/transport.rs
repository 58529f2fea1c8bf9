//! HTTP transport to the gateway.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::{normalize_gateway_url, DEFAULT_TIMEOUT_SECS};
use crate::error::{ProtocolError, ProtocolResult};

/// Moves request and response bodies to and from the gateway.
///
/// Paths are relative to the gateway URL (`Auth`, `Key/{fingerprint}`, ...).
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body and return the response body.
    async fn post(&self, path: &str, body: Vec<u8>) -> ProtocolResult<Vec<u8>>;

    /// GET a path and return the response body.
    async fn get(&self, path: &str) -> ProtocolResult<Vec<u8>>;
}

/// [`Transport`] over HTTPS.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport with the default timeout.
    pub fn new(gateway_url: &str) -> ProtocolResult<Self> {
        Self::with_timeout(gateway_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(gateway_url: &str, timeout: Duration) -> ProtocolResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProtocolError::transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: normalize_gateway_url(gateway_url),
        })
    }

    /// Gateway URL, always ending in `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn read_body(&self, path: &str, response: reqwest::Response) -> ProtocolResult<Vec<u8>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(path = path, status = status.as_u16(), body = %body, "Gateway returned an error status");
            return Err(ProtocolError::Http {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        debug!(path = path, bytes = bytes.len(), "Gateway response received");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: Vec<u8>) -> ProtocolResult<Vec<u8>> {
        let url = self.url(path);
        debug!(url = %url, bytes = body.len(), "Posting to gateway");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        self.read_body(path, response).await
    }

    async fn get(&self, path: &str) -> ProtocolResult<Vec<u8>> {
        let url = self.url(path);
        debug!(url = %url, "Querying gateway");

        let response = self.client.get(&url).send().await?;
        self.read_body(path, response).await
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}
