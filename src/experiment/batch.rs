//! Experiment Batch - the request body of one bulk call

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ExperimentItem;
use crate::error::{Error, Result};

/// Per-request body limit enforced by the bulk endpoint (4 MiB).
pub const MAX_BATCH_BYTES: usize = 4 * 1024 * 1024;

/// Experiment Batch groups items evaluated against one dataset under one
/// experiment name.
///
/// Serializes to exactly the JSON body of
/// `PUT /api/v1/private/experiments/items/bulk`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentBatch {
    experiment_name: String,
    dataset_name: String,
    items: Vec<ExperimentItem>,
}

impl ExperimentBatch {
    /// Create a batch from its parts.
    ///
    /// # Arguments
    ///
    /// * `experiment_name` - Experiment to log into (created server-side if missing)
    /// * `dataset_name` - Dataset the items belong to
    /// * `items` - Evaluated items, in submission order
    #[must_use]
    pub fn new(
        experiment_name: impl Into<String>,
        dataset_name: impl Into<String>,
        items: Vec<ExperimentItem>,
    ) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            dataset_name: dataset_name.into(),
            items,
        }
    }

    /// Create a builder that accumulates items.
    #[must_use]
    pub fn builder(
        experiment_name: impl Into<String>,
        dataset_name: impl Into<String>,
    ) -> ExperimentBatchBuilder {
        ExperimentBatchBuilder::new(experiment_name, dataset_name)
    }

    /// Get the experiment name.
    #[must_use]
    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    /// Get the dataset name.
    #[must_use]
    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    /// Get the items.
    #[must_use]
    pub fn items(&self) -> &[ExperimentItem] {
        &self.items
    }

    /// Consume the batch, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<ExperimentItem> {
        self.items
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an item.
    pub fn push(&mut self, item: ExperimentItem) {
        self.items.push(item);
    }

    /// Check every client-side invariant of the bulk request.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if either name is blank
    /// - `EmptyBatch` if there are no items
    /// - `DuplicateItemId` if two items share a dataset item ID
    /// - `InvalidFeedbackScore` / `InvalidTimeRange` for malformed item content
    pub fn validate(&self) -> Result<()> {
        if self.experiment_name.trim().is_empty() {
            return Err(Error::EmptyField("experiment_name"));
        }
        if self.dataset_name.trim().is_empty() {
            return Err(Error::EmptyField("dataset_name"));
        }
        if self.items.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !seen.insert(item.dataset_item_id()) {
                return Err(Error::DuplicateItemId(item.dataset_item_id()));
            }
        }
        self.items.iter().try_for_each(ExperimentItem::validate)
    }

    /// Encode the batch as the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns `Json` if a metadata value cannot be serialized.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Length in bytes of the encoded request body.
    ///
    /// # Errors
    ///
    /// Returns `Json` if a metadata value cannot be serialized.
    pub fn encoded_len(&self) -> Result<usize> {
        self.encode().map(|body| body.len())
    }

    /// Parse a request body, rejecting items that carry both a task result
    /// and a trace.
    ///
    /// # Errors
    ///
    /// Returns `Json` for malformed JSON or schema violations.
    pub fn decode(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Read and parse a request body from a JSON file.
    ///
    /// # Errors
    ///
    /// - `Io` if the file cannot be read
    /// - `Json` for malformed JSON or schema violations
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let body = std::fs::read(path)?;
        Self::decode(&body)
    }

    /// A batch with the same names and the given items.
    pub(crate) fn with_items(&self, items: Vec<ExperimentItem>) -> Self {
        Self {
            experiment_name: self.experiment_name.clone(),
            dataset_name: self.dataset_name.clone(),
            items,
        }
    }
}

/// Builder for `ExperimentBatch`.
#[derive(Debug)]
pub struct ExperimentBatchBuilder {
    batch: ExperimentBatch,
}

impl ExperimentBatchBuilder {
    /// Create a new builder with the required names.
    #[must_use]
    pub fn new(experiment_name: impl Into<String>, dataset_name: impl Into<String>) -> Self {
        Self {
            batch: ExperimentBatch::new(experiment_name, dataset_name, Vec::new()),
        }
    }

    /// Add an item.
    #[must_use]
    pub fn item(mut self, item: ExperimentItem) -> Self {
        self.batch.items.push(item);
        self
    }

    /// Add several items.
    #[must_use]
    pub fn items(mut self, items: impl IntoIterator<Item = ExperimentItem>) -> Self {
        self.batch.items.extend(items);
        self
    }

    /// Build the `ExperimentBatch` without validating it.
    #[must_use]
    pub fn build(self) -> ExperimentBatch {
        self.batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::FeedbackScore;
    use uuid::Uuid;

    #[test]
    fn test_minimal_batch_valid() {
        let batch = ExperimentBatch::builder("exp", "ds")
            .item(ExperimentItem::new(Uuid::new_v4()))
            .build();
        assert!(batch.validate().is_ok());
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_blank_names_rejected() {
        let batch = ExperimentBatch::new(" ", "ds", vec![ExperimentItem::new(Uuid::new_v4())]);
        assert!(matches!(
            batch.validate(),
            Err(Error::EmptyField("experiment_name"))
        ));

        let batch = ExperimentBatch::new("exp", "", vec![ExperimentItem::new(Uuid::new_v4())]);
        assert!(matches!(batch.validate(), Err(Error::EmptyField("dataset_name"))));
    }

    #[test]
    fn test_empty_batch_rejected() {
        let batch = ExperimentBatch::builder("exp", "ds").build();
        assert!(matches!(batch.validate(), Err(Error::EmptyBatch)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let id = Uuid::new_v4();
        let batch = ExperimentBatch::builder("exp", "ds")
            .item(ExperimentItem::new(id))
            .item(ExperimentItem::new(id))
            .build();
        match batch.validate() {
            Err(Error::DuplicateItemId(dup)) => assert_eq!(dup, id),
            other => panic!("expected DuplicateItemId, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_reported_before_item_problems() {
        let id = Uuid::new_v4();
        let batch = ExperimentBatch::builder("exp", "ds")
            .item(ExperimentItem::new(id))
            .item(
                ExperimentItem::builder(Uuid::new_v4())
                    .feedback_score(FeedbackScore::new("", 1.0))
                    .build(),
            )
            .item(ExperimentItem::new(id))
            .build();
        match batch.validate() {
            Err(Error::DuplicateItemId(dup)) => assert_eq!(dup, id),
            other => panic!("expected DuplicateItemId, got {other:?}"),
        }
    }

    #[test]
    fn test_read_from_file() {
        let batch = ExperimentBatch::builder("exp", "ds")
            .item(ExperimentItem::builder(Uuid::new_v4()).task_result("Paris").build())
            .build();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(&path, batch.encode().unwrap()).unwrap();

        assert_eq!(ExperimentBatch::read_from(&path).unwrap(), batch);
    }

    #[test]
    fn test_read_from_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExperimentBatch::read_from(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_encoded_len_matches_body() {
        let batch = ExperimentBatch::builder("exp", "ds")
            .item(ExperimentItem::new(Uuid::new_v4()))
            .build();
        let body = batch.encode().unwrap();
        assert_eq!(batch.encoded_len().unwrap(), body.len());
        assert_eq!(ExperimentBatch::decode(&body).unwrap(), batch);
    }
}
