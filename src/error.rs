//! Error types for opik-bulk
//!
//! Clear error messages with actionable guidance: every variant says what was
//! wrong and, where possible, what to do about it.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// opik-bulk error types
#[derive(Error, Debug)]
pub enum Error {
    /// A required string field was empty or whitespace
    #[error("Required field `{0}` must not be empty")]
    EmptyField(&'static str),

    /// Batch carried no items
    #[error("Experiment batch has no items\nA bulk request must contain at least one item.")]
    EmptyBatch,

    /// Two items in one batch share a dataset item ID
    #[error("Duplicate dataset_item_id {0} within a single batch")]
    DuplicateItemId(Uuid),

    /// Item carried both `evaluate_task_result` and `trace`
    #[error("Item {0} carries both `evaluate_task_result` and `trace`\nProvide exactly one of them.")]
    ConflictingItemOutput(Uuid),

    /// Feedback score failed validation
    #[error("Invalid feedback score on item {item}: {reason}")]
    InvalidFeedbackScore {
        /// Dataset item that owns the score
        item: Uuid,
        /// What was wrong with it
        reason: String,
    },

    /// Trace or span ends before it starts
    #[error("Invalid time range on {context} of item {item}: end_time precedes start_time")]
    InvalidTimeRange {
        /// Dataset item that owns the record
        item: Uuid,
        /// `trace` or `span <name>`
        context: String,
    },

    /// Serialized request body exceeds the per-request limit
    #[error("Payload too large: {size} bytes exceeds {max} bytes\nSplit the batch (see `BatchSplitter` or `log_batch_chunked`).")]
    PayloadTooLarge {
        /// Encoded body size
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// A single item cannot fit in any request
    #[error("Item {id} alone encodes to {size} bytes, over the {max} byte limit")]
    ItemTooLarge {
        /// Offending dataset item
        id: Uuid,
        /// Size of the one-item batch
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Endpoint answered with something other than 204
    #[error("Bulk endpoint returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// One chunk of a chunked submission failed
    #[error("Chunk {chunk} failed after {items_accepted} items were accepted: {source}")]
    ChunkFailed {
        /// Zero-based index of the failing chunk
        chunk: usize,
        /// Items accepted by earlier chunks
        items_accepted: usize,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed base URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether retrying the same request could succeed.
    ///
    /// True for rate limiting (429), server-side failures (5xx) and transport
    /// errors (timeouts, refused connections).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::ChunkFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// HTTP status of an `Api` error (or of the failing chunk).
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::ChunkFailed { source, .. } => source.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_retryable() {
        let err = Error::Api {
            status: 503,
            body: String::new(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(503));

        let err = Error::Api {
            status: 400,
            body: String::new(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_chunk_failed_delegates() {
        let err = Error::ChunkFailed {
            chunk: 2,
            items_accepted: 10,
            source: Box::new(Error::Api {
                status: 429,
                body: "slow down".to_string(),
            }),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(429));
    }
}
