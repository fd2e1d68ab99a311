//! HTTP transport using `reqwest`.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{BulkTransport, TransportResponse};
use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Header naming the workspace on authenticated deployments.
pub const WORKSPACE_HEADER: &str = "comet-workspace";

/// Sends bulk requests to a live endpoint.
///
/// Cheap to clone: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Build a transport from client settings.
    ///
    /// Authentication headers are installed as defaults on the client:
    /// `Authorization` carries the raw key (no `Bearer` prefix).
    ///
    /// # Errors
    ///
    /// - `Config` if the key or workspace contain bytes invalid in a header
    /// - `InvalidUrl` if the endpoint cannot be derived
    /// - `Http` if the TLS backend fails to initialize
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(key) = config.api_key() {
            let mut value = HeaderValue::from_str(key)
                .map_err(|_| Error::Config("API key is not a valid header value".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(workspace) = config.workspace() {
            let value = HeaderValue::from_str(workspace)
                .map_err(|_| Error::Config("workspace is not a valid header value".to_string()))?;
            headers.insert(HeaderName::from_static(WORKSPACE_HEADER), value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .user_agent(concat!("opik-bulk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint()?,
        })
    }

    /// Endpoint this transport sends to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl BulkTransport for HttpTransport {
    async fn put_bulk(&self, body: Vec<u8>) -> Result<TransportResponse> {
        debug!(endpoint = %self.endpoint, bytes = body.len(), "PUT bulk experiment items");

        let response = self
            .client
            .put(self.endpoint.clone())
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(status, error = %e, "failed to read bulk endpoint response body");
                String::new()
            }
        };

        debug!(status, "bulk endpoint responded");
        Ok(TransportResponse {
            status,
            body,
            retry_after,
        })
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}
