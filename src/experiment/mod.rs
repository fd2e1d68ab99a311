//! Experiment Item Wire Schema
//!
//! Data structures for the bulk experiment-item request body.
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentBatch (experiment_name, dataset_name)
//!   └──< ExperimentItem (N, unique dataset_item_id)
//!          ├── evaluate_task_result | trace   [at most one]
//!          ├──< SpanRecord (N)
//!          └──< FeedbackScore (N)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use opik_bulk::experiment::{ExperimentBatch, ExperimentItem, FeedbackScore};
//! use uuid::Uuid;
//!
//! let item = ExperimentItem::builder(Uuid::new_v4())
//!     .task_result("Paris")
//!     .feedback_score(FeedbackScore::new("exact_match", 1.0))
//!     .build();
//!
//! let batch = ExperimentBatch::builder("geography-v2", "capitals")
//!     .item(item)
//!     .build();
//!
//! batch.validate()?;
//! assert!(batch.encoded_len()? < opik_bulk::experiment::MAX_BATCH_BYTES);
//! # Ok::<(), opik_bulk::Error>(())
//! ```

mod batch;
mod feedback_score;
mod item;
mod split;
mod trace;

pub use batch::{ExperimentBatch, ExperimentBatchBuilder, MAX_BATCH_BYTES};
pub use feedback_score::{FeedbackScore, FeedbackScoreBuilder, ScoreSource};
pub use item::{ExperimentItem, ExperimentItemBuilder, ItemOutput, TaskResult};
pub use split::BatchSplitter;
pub use trace::{ErrorInfo, SpanRecord, SpanRecordBuilder, SpanType, TraceRecord, TraceRecordBuilder};
