//! In-memory transport emulating the bulk endpoint, using `DashMap`.
//!
//! Applies the same acceptance rules as the server side of the contract:
//! 413 over the size limit, 400 for unparseable or invalid payloads,
//! 204 otherwise. Accepted items are kept per experiment name.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use dashmap::DashMap;
use tracing::debug;

use super::{BulkTransport, TransportResponse};
use crate::experiment::{ExperimentBatch, ExperimentItem, MAX_BATCH_BYTES};
use crate::Result;

/// In-process stand-in for the bulk endpoint.
///
/// Thread-safe; accepted items are grouped by experiment name in arrival
/// order. Scripted responses queued with [`MemoryTransport::respond_with`]
/// are returned (without recording anything) before normal handling resumes.
///
/// # Example
///
/// ```rust
/// use opik_bulk::transport::{BulkTransport, MemoryTransport, TransportResponse};
///
/// # async fn example() -> opik_bulk::Result<()> {
/// let transport = MemoryTransport::new();
/// transport.respond_with(TransportResponse::new(503, "busy"));
///
/// let response = transport.put_bulk(b"{}".to_vec()).await?;
/// assert_eq!(response.status, 503);
/// assert_eq!(transport.request_count(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryTransport {
    experiments: DashMap<String, Vec<ExperimentItem>>,
    scripted: Mutex<VecDeque<TransportResponse>>,
    requests: AtomicUsize,
    max_bytes: usize,
}

impl MemoryTransport {
    /// Create an empty transport with the standard 4 MiB limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(MAX_BATCH_BYTES)
    }

    /// Create an empty transport with a custom body limit.
    #[must_use]
    pub fn with_limit(max_bytes: usize) -> Self {
        Self {
            experiments: DashMap::new(),
            scripted: Mutex::new(VecDeque::new()),
            requests: AtomicUsize::new(0),
            max_bytes,
        }
    }

    /// Queue a response to return for the next request.
    pub fn respond_with(&self, response: TransportResponse) {
        self.scripted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(response);
    }

    /// Number of requests received, including rejected ones.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Items accepted so far for an experiment, in arrival order.
    #[must_use]
    pub fn items(&self, experiment_name: &str) -> Vec<ExperimentItem> {
        self.experiments
            .get(experiment_name)
            .map(|items| items.value().clone())
            .unwrap_or_default()
    }

    /// Total accepted items across all experiments.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.experiments.iter().map(|entry| entry.value().len()).sum()
    }

    /// Number of distinct experiments that received items.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Whether nothing has been accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Forget all accepted items.
    pub fn clear(&self) {
        self.experiments.clear();
    }

    fn next_scripted(&self) -> Option<TransportResponse> {
        self.scripted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
    }

    fn handle(&self, body: &[u8]) -> TransportResponse {
        if body.len() > self.max_bytes {
            return TransportResponse::new(
                413,
                error_body(&format!(
                    "request body of {} bytes exceeds {} bytes",
                    body.len(),
                    self.max_bytes
                )),
            );
        }

        let batch = match ExperimentBatch::decode(body) {
            Ok(batch) => batch,
            Err(e) => return TransportResponse::new(400, error_body(&e.to_string())),
        };
        if let Err(e) = batch.validate() {
            return TransportResponse::new(400, error_body(&e.to_string()));
        }

        let experiment = batch.experiment_name().to_string();
        self.experiments
            .entry(experiment)
            .or_default()
            .extend(batch.into_items());
        TransportResponse::no_content()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl BulkTransport for MemoryTransport {
    async fn put_bulk(&self, body: Vec<u8>) -> Result<TransportResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let response = self.next_scripted().unwrap_or_else(|| self.handle(&body));
        debug!(status = response.status, bytes = body.len(), "memory transport handled request");
        Ok(response)
    }

    fn describe(&self) -> String {
        "memory://experiments/items/bulk".to_string()
    }
}

fn error_body(message: &str) -> String {
    serde_json::json!({ "errors": [message] }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn body(experiment: &str, ids: &[Uuid]) -> Vec<u8> {
        let batch = ExperimentBatch::builder(experiment, "ds")
            .items(ids.iter().copied().map(ExperimentItem::new))
            .build();
        batch.encode().unwrap()
    }

    #[tokio::test]
    async fn test_memory_accepts_valid_batch() {
        let transport = MemoryTransport::new();
        let ids = [Uuid::new_v4(), Uuid::new_v4()];

        let response = transport.put_bulk(body("exp", &ids)).await.unwrap();

        assert_eq!(response, TransportResponse::no_content());
        assert_eq!(transport.item_count(), 2);
        let stored: Vec<Uuid> = transport
            .items("exp")
            .iter()
            .map(ExperimentItem::dataset_item_id)
            .collect();
        assert_eq!(stored, ids);
    }

    #[tokio::test]
    async fn test_memory_rejects_malformed_json() {
        let transport = MemoryTransport::new();
        let response = transport.put_bulk(b"not json".to_vec()).await.unwrap();
        assert_eq!(response.status, 400);
        assert!(transport.is_empty());
    }

    #[tokio::test]
    async fn test_memory_rejects_item_with_result_and_trace() {
        let transport = MemoryTransport::new();
        let id = Uuid::new_v4();
        let body = serde_json::json!({
            "experiment_name": "exp",
            "dataset_name": "ds",
            "items": [{
                "dataset_item_id": id,
                "evaluate_task_result": {"output": "Paris"},
                "trace": {"start_time": "2025-01-15T12:00:00Z"}
            }]
        });

        let response = transport.put_bulk(body.to_string().into_bytes()).await.unwrap();

        assert_eq!(response.status, 400);
        assert!(response.body.contains("carries both"));
        assert!(response.body.contains(&id.to_string()));
        assert!(transport.is_empty());
    }

    #[tokio::test]
    async fn test_memory_rejects_oversized_body() {
        let transport = MemoryTransport::with_limit(64);
        let response = transport
            .put_bulk(body("exp", &[Uuid::new_v4(), Uuid::new_v4()]))
            .await
            .unwrap();
        assert_eq!(response.status, 413);
        assert!(transport.is_empty());
    }

    #[tokio::test]
    async fn test_memory_scripted_then_normal() {
        let transport = MemoryTransport::new();
        transport.respond_with(TransportResponse::new(500, "boom"));

        let first = transport.put_bulk(body("exp", &[Uuid::new_v4()])).await.unwrap();
        let second = transport.put_bulk(body("exp", &[Uuid::new_v4()])).await.unwrap();

        assert_eq!(first.status, 500);
        assert_eq!(second.status, 204);
        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.item_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_groups_by_experiment() {
        let transport = MemoryTransport::new();
        transport.put_bulk(body("a", &[Uuid::new_v4()])).await.unwrap();
        transport.put_bulk(body("b", &[Uuid::new_v4()])).await.unwrap();
        transport.put_bulk(body("a", &[Uuid::new_v4()])).await.unwrap();

        assert_eq!(transport.experiment_count(), 2);
        assert_eq!(transport.items("a").len(), 2);
        assert_eq!(transport.items("b").len(), 1);

        transport.clear();
        assert!(transport.is_empty());
    }
}
