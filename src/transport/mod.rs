//! Transport layer for the bulk endpoint
//!
//! The client encodes and validates; a transport only moves bytes:
//!
//! - [`HttpTransport`]: real `PUT` over HTTP(S) via `reqwest`
//! - [`MemoryTransport`]: in-process emulation of the endpoint contract,
//!   for tests and dry runs
//!
//! # Example
//!
//! ```rust
//! use opik_bulk::transport::{BulkTransport, MemoryTransport};
//!
//! # async fn example() -> opik_bulk::Result<()> {
//! let transport = MemoryTransport::new();
//! let body = br#"{"experiment_name":"e","dataset_name":"d","items":[
//!     {"dataset_item_id":"0193e1e2-6f4e-7b8a-9c4d-1a2b3c4d5e6f"}]}"#;
//! let response = transport.put_bulk(body.to_vec()).await?;
//! assert_eq!(response.status, 204);
//! # Ok(())
//! # }
//! ```

mod http;
mod memory;

pub use http::HttpTransport;
pub use memory::MemoryTransport;

use crate::Result;
use std::future::Future;
use std::time::Duration;

/// Raw outcome of one bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body (empty on 204).
    pub body: String,
    /// Parsed `Retry-After` header, when present in seconds form.
    pub retry_after: Option<Duration>,
}

impl TransportResponse {
    /// Response with the given status and body, no `Retry-After`.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// The `204 No Content` the endpoint answers on success.
    #[must_use]
    pub fn no_content() -> Self {
        Self::new(204, String::new())
    }

    /// Whether this is the endpoint's success status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status == 204
    }
}

/// Sends encoded bulk request bodies to an experiment-items endpoint.
pub trait BulkTransport: Send + Sync {
    /// Send one `PUT` with the given JSON body.
    ///
    /// Transports report every HTTP status as `Ok`; only failures to obtain
    /// a response at all are `Err`.
    fn put_bulk(&self, body: Vec<u8>) -> impl Future<Output = Result<TransportResponse>> + Send;

    /// Short human-readable destination, used in logs.
    fn describe(&self) -> String;
}
