//! Batch Splitter - partition a batch into requests under the size limit
//!
//! The encoded size of a chunk is computed without re-encoding it:
//!
//! ```text
//! {"experiment_name":..,"dataset_name":..,"items":[ item0 , item1 , ... ]}
//! └──────────────── envelope (items = []) ───────────────┘  + Σ item + (n-1) commas
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{ExperimentBatch, ExperimentItem, MAX_BATCH_BYTES};
use crate::error::{Error, Result};

/// Splits an `ExperimentBatch` into ordered sub-batches that each fit in one
/// bulk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSplitter {
    max_bytes: usize,
    max_items: Option<usize>,
}

impl Default for BatchSplitter {
    fn default() -> Self {
        Self::new(MAX_BATCH_BYTES)
    }
}

impl BatchSplitter {
    /// Create a splitter with a byte limit per chunk.
    #[must_use]
    pub const fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            max_items: None,
        }
    }

    /// Also cap the number of items per chunk (values below 1 are treated as 1).
    #[must_use]
    pub const fn max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(if max_items == 0 { 1 } else { max_items });
        self
    }

    /// The same splitter with its byte limit lowered to `max` if higher.
    #[must_use]
    pub const fn capped(mut self, max: usize) -> Self {
        if self.max_bytes > max {
            self.max_bytes = max;
        }
        self
    }

    /// Byte limit per chunk.
    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Split `batch` into chunks, preserving item order.
    ///
    /// An empty batch yields no chunks.
    ///
    /// # Errors
    ///
    /// - `ItemTooLarge` if one item cannot fit even on its own
    /// - `PayloadTooLarge` if the envelope alone exceeds the limit
    /// - `Json` if an item cannot be serialized
    pub fn split(&self, batch: &ExperimentBatch) -> Result<Vec<ExperimentBatch>> {
        let envelope = batch.with_items(Vec::new()).encoded_len()?;
        if envelope > self.max_bytes {
            return Err(Error::PayloadTooLarge {
                size: envelope,
                max: self.max_bytes,
            });
        }

        let mut chunks = Vec::new();
        let mut current: Vec<ExperimentItem> = Vec::new();
        let mut current_len = envelope;

        for item in batch.items() {
            let item_len = serde_json::to_vec(item)?.len();
            if envelope + item_len > self.max_bytes {
                return Err(Error::ItemTooLarge {
                    id: item.dataset_item_id(),
                    size: envelope + item_len,
                    max: self.max_bytes,
                });
            }

            let separator = usize::from(!current.is_empty());
            let over_bytes = current_len + separator + item_len > self.max_bytes;
            let over_items = self.max_items.is_some_and(|max| current.len() >= max);
            if !current.is_empty() && (over_bytes || over_items) {
                chunks.push(batch.with_items(std::mem::take(&mut current)));
                current_len = envelope;
            }

            current_len += usize::from(!current.is_empty()) + item_len;
            current.push(item.clone());
        }

        if !current.is_empty() {
            chunks.push(batch.with_items(current));
        }

        debug!(
            experiment = batch.experiment_name(),
            items = batch.len(),
            chunks = chunks.len(),
            max_bytes = self.max_bytes,
            "split batch"
        );
        Ok(chunks)
    }

    /// Split `batch` and write each chunk to `out_dir` as `chunk-NNNN.json`.
    ///
    /// The directory is created if missing. Returns the written paths in
    /// chunk order.
    ///
    /// # Errors
    ///
    /// - errors from [`BatchSplitter::split`]
    /// - `Io` if the directory or a file cannot be written
    pub fn write_chunks(&self, batch: &ExperimentBatch, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let chunks = self.split(batch)?;
        std::fs::create_dir_all(out_dir)?;

        let mut paths = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let path = out_dir.join(format!("chunk-{index:04}.json"));
            std::fs::write(&path, chunk.encode()?)?;
            paths.push(path);
        }
        Ok(paths)
    }
}
