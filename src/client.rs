//! Bulk experiment-item client
//!
//! Validates a batch, enforces the request size limit client-side, sends it
//! through a [`BulkTransport`], and maps the response: `204` is success,
//! anything else is [`Error::Api`].
//!
//! ```rust,no_run
//! use opik_bulk::{ClientConfig, ExperimentItemsClient};
//! use opik_bulk::experiment::{ExperimentBatch, ExperimentItem};
//! use uuid::Uuid;
//!
//! # async fn example() -> opik_bulk::Result<()> {
//! let client = ExperimentItemsClient::from_config(&ClientConfig::from_env()?)?;
//! let batch = ExperimentBatch::builder("my-experiment", "my-dataset")
//!     .item(ExperimentItem::builder(Uuid::new_v4()).task_result("42").build())
//!     .build();
//! client.log_batch(&batch).await?;
//! # Ok(())
//! # }
//! ```

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{Error, Result};
use crate::experiment::{BatchSplitter, ExperimentBatch, MAX_BATCH_BYTES};
use crate::transport::{BulkTransport, HttpTransport, TransportResponse};

/// Summary of a chunked submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// Requests that returned 204.
    pub chunks_sent: usize,
    /// Items contained in those requests.
    pub items_sent: usize,
    /// Encoded bytes of those requests.
    pub bytes_sent: usize,
}

/// Failure body returned by the endpoint.
///
/// The shape is not fixed; both `{"errors": [...]}` and
/// `{"code": .., "message": ..}` are recognized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorBody {
    /// Validation messages.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Single error message.
    #[serde(default)]
    pub message: Option<String>,
    /// Numeric code echoed by the server.
    #[serde(default)]
    pub code: Option<u16>,
}

impl ApiErrorBody {
    /// Parse a response body, if it is JSON in a recognized shape.
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<Self>(body)
            .ok()
            .filter(|b| !b.errors.is_empty() || b.message.is_some())
    }

    /// All messages, `message` first.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.message
            .as_deref()
            .into_iter()
            .chain(self.errors.iter().map(String::as_str))
            .collect()
    }

    /// Best-effort one-line summary of a raw response body.
    #[must_use]
    pub fn summarize(body: &str) -> String {
        if let Some(parsed) = Self::parse(body) {
            return parsed.messages().join("; ");
        }
        match serde_json::from_str::<Value>(body) {
            Ok(value) if !value.is_null() => value.to_string(),
            _ => body.trim().to_string(),
        }
    }
}

/// Client for `PUT /api/v1/private/experiments/items/bulk`.
#[derive(Debug, Clone)]
pub struct ExperimentItemsClient<T = HttpTransport> {
    transport: T,
    max_batch_bytes: usize,
    retry: RetryPolicy,
}

impl ExperimentItemsClient<HttpTransport> {
    /// Create an HTTP client from settings.
    ///
    /// # Errors
    ///
    /// Propagates transport construction errors (see [`HttpTransport::new`]).
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(config)?)
            .with_max_batch_bytes(config.max_batch_bytes())
            .with_retry(config.retry()))
    }
}

impl<T: BulkTransport> ExperimentItemsClient<T> {
    /// Create a client over any transport, with the 4 MiB limit and no retries.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            max_batch_bytes: MAX_BATCH_BYTES,
            retry: RetryPolicy::none(),
        }
    }

    /// Set the request body limit (clamped to 4 MiB).
    #[must_use]
    pub fn with_max_batch_bytes(mut self, max: usize) -> Self {
        self.max_batch_bytes = max.clamp(1, MAX_BATCH_BYTES);
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Request body limit.
    #[must_use]
    pub const fn max_batch_bytes(&self) -> usize {
        self.max_batch_bytes
    }

    /// Log one batch in a single request.
    ///
    /// # Errors
    ///
    /// - validation errors from [`ExperimentBatch::validate`]
    /// - `PayloadTooLarge` if the body exceeds the limit (nothing is sent)
    /// - `Api` for any status other than 204
    /// - `Http` if no response was obtained
    #[instrument(skip_all, fields(experiment = batch.experiment_name(), items = batch.len()))]
    pub async fn log_batch(&self, batch: &ExperimentBatch) -> Result<()> {
        batch.validate()?;
        let body = batch.encode()?;
        if body.len() > self.max_batch_bytes {
            return Err(Error::PayloadTooLarge {
                size: body.len(),
                max: self.max_batch_bytes,
            });
        }

        let bytes = body.len();
        self.send(body).await?;
        info!(bytes, "logged experiment items");
        Ok(())
    }

    /// Log a batch of any size, splitting it into as many requests as needed.
    ///
    /// Chunks are sent in order; the first failure stops the submission.
    ///
    /// # Errors
    ///
    /// - validation errors, checked on the whole batch before anything is sent
    /// - `ItemTooLarge` if one item cannot fit in any request
    /// - `ChunkFailed` wrapping the failure of a chunk, with the number of
    ///   items accepted by earlier chunks
    #[instrument(skip_all, fields(experiment = batch.experiment_name(), items = batch.len()))]
    pub async fn log_batch_chunked(&self, batch: &ExperimentBatch) -> Result<BulkReport> {
        self.log_batch_chunked_with(batch, BatchSplitter::new(self.max_batch_bytes))
            .await
    }

    /// Like [`Self::log_batch_chunked`] with a custom splitter.
    ///
    /// The splitter's byte limit is lowered to the client's when larger.
    ///
    /// # Errors
    ///
    /// See [`Self::log_batch_chunked`].
    pub async fn log_batch_chunked_with(
        &self,
        batch: &ExperimentBatch,
        splitter: BatchSplitter,
    ) -> Result<BulkReport> {
        batch.validate()?;
        let chunks = splitter.capped(self.max_batch_bytes).split(batch)?;
        let total = chunks.len();

        let mut report = BulkReport::default();
        for (index, chunk) in chunks.into_iter().enumerate() {
            let body = chunk.encode()?;
            let bytes = body.len();
            debug!(chunk = index, of = total, items = chunk.len(), bytes, "sending chunk");

            if let Err(e) = self.send(body).await {
                warn!(chunk = index, error = %e, "chunk rejected");
                return Err(Error::ChunkFailed {
                    chunk: index,
                    items_accepted: report.items_sent,
                    source: Box::new(e),
                });
            }
            report.chunks_sent += 1;
            report.items_sent += chunk.len();
            report.bytes_sent += bytes;
        }

        info!(
            chunks = report.chunks_sent,
            bytes = report.bytes_sent,
            "logged experiment items in chunks"
        );
        Ok(report)
    }

    /// Send a body, retrying per policy, and require 204.
    async fn send(&self, mut body: Vec<u8>) -> Result<()> {
        let mut attempt = 0u32;
        loop {
            let payload = if attempt < self.retry.max_retries {
                body.clone()
            } else {
                std::mem::take(&mut body)
            };

            let (error, retry_after) = match self.transport.put_bulk(payload).await {
                Ok(response) if response.is_success() => return Ok(()),
                Ok(response) => {
                    let retry_after = response.retry_after.filter(|_| response.status == 429);
                    (api_error(response), retry_after)
                }
                Err(e) => (e, None),
            };

            if !error.is_retryable() || attempt >= self.retry.max_retries {
                return Err(error);
            }
            attempt += 1;
            let delay = self.retry.backoff(attempt, retry_after);
            warn!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                destination = %self.transport.describe(),
                error = %error,
                "retrying bulk request"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn api_error(response: TransportResponse) -> Error {
    Error::Api {
        status: response.status,
        body: response.body,
    }
}
