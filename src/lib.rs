//! # opik-bulk: Bulk Experiment-Item Logging Client
//!
//! Typed client for `PUT /api/v1/private/experiments/items/bulk`, the
//! endpoint that records evaluation results (task outputs or traces, spans
//! and feedback scores) for many dataset items of one experiment at once.
//!
//! ## Design Principles
//!
//! - **Invalid payloads are unrepresentable**: an item holds a task result
//!   *or* a trace ([`experiment::ItemOutput`]), never both
//! - **Fail before the wire**: validation and the 4 MiB body limit are checked
//!   client-side, so oversized requests are never sent
//! - **Split, don't truncate**: [`experiment::BatchSplitter`] partitions large
//!   batches into requests that each fit
//! - **Transport seam**: [`transport::BulkTransport`] separates encoding from
//!   I/O, with an in-memory implementation for tests
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use opik_bulk::experiment::{ExperimentBatch, ExperimentItem, FeedbackScore};
//! use opik_bulk::{ClientConfig, ExperimentItemsClient};
//! use uuid::Uuid;
//!
//! # async fn run() -> opik_bulk::Result<()> {
//! // OPIK_URL_OVERRIDE / OPIK_API_KEY / OPIK_WORKSPACE
//! let client = ExperimentItemsClient::from_config(&ClientConfig::from_env()?)?;
//!
//! let batch = ExperimentBatch::builder("capitals-gpt4o", "capitals")
//!     .item(
//!         ExperimentItem::builder(Uuid::new_v4())
//!             .task_result("Paris")
//!             .feedback_score(FeedbackScore::new("exact_match", 1.0))
//!             .build(),
//!     )
//!     .build();
//!
//! let report = client.log_batch_chunked(&batch).await?;
//! println!("{} items in {} requests", report.items_sent, report.chunks_sent);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod client;
pub mod config;
pub mod error;
pub mod experiment;
pub mod transport;

pub use client::{ApiErrorBody, BulkReport, ExperimentItemsClient};
pub use config::{ClientConfig, ClientConfigBuilder, RetryPolicy};
pub use error::{Error, Result};
