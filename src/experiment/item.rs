//! Experiment Item - one evaluated dataset item inside a bulk request

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{FeedbackScore, SpanRecord, TraceRecord};
use crate::error::Error;

/// Raw output of the evaluated task.
///
/// The endpoint accepts a JSON object, array or string; other JSON kinds are
/// rejected on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TaskResult {
    /// JSON object, e.g. `{"output": "Paris"}`.
    Object(Map<String, Value>),
    /// JSON array.
    Array(Vec<Value>),
    /// Plain string.
    Text(String),
}

impl From<String> for TaskResult {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for TaskResult {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Map<String, Value>> for TaskResult {
    fn from(map: Map<String, Value>) -> Self {
        Self::Object(map)
    }
}

impl From<Vec<Value>> for TaskResult {
    fn from(values: Vec<Value>) -> Self {
        Self::Array(values)
    }
}

impl TryFrom<Value> for TaskResult {
    type Error = Value;

    /// Convert a JSON value, handing it back unchanged if it is not an
    /// object, array or string.
    fn try_from(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Object(map) => Ok(Self::Object(map)),
            Value::Array(values) => Ok(Self::Array(values)),
            Value::String(text) => Ok(Self::Text(text)),
            other => Err(other),
        }
    }
}

/// What an item records about its evaluation: a raw task result or a full
/// trace, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutput {
    /// Sent as `evaluate_task_result`.
    TaskResult(TaskResult),
    /// Sent as `trace`.
    Trace(TraceRecord),
}

/// Experiment Item links one dataset item to its evaluation outcome.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ItemWire")]
pub struct ExperimentItem {
    dataset_item_id: Uuid,
    output: Option<ItemOutput>,
    spans: Vec<SpanRecord>,
    feedback_scores: Vec<FeedbackScore>,
}

impl ExperimentItem {
    /// Create an item with no output, spans or scores.
    #[must_use]
    pub const fn new(dataset_item_id: Uuid) -> Self {
        Self {
            dataset_item_id,
            output: None,
            spans: Vec::new(),
            feedback_scores: Vec::new(),
        }
    }

    /// Create a builder for constructing an item with optional fields.
    #[must_use]
    pub const fn builder(dataset_item_id: Uuid) -> ExperimentItemBuilder {
        ExperimentItemBuilder::new(dataset_item_id)
    }

    /// Get the dataset item ID.
    #[must_use]
    pub const fn dataset_item_id(&self) -> Uuid {
        self.dataset_item_id
    }

    /// Get the recorded output, if any.
    #[must_use]
    pub const fn output(&self) -> Option<&ItemOutput> {
        self.output.as_ref()
    }

    /// Get the task result, if the output is one.
    #[must_use]
    pub const fn task_result(&self) -> Option<&TaskResult> {
        match &self.output {
            Some(ItemOutput::TaskResult(result)) => Some(result),
            _ => None,
        }
    }

    /// Get the trace, if the output is one.
    #[must_use]
    pub const fn trace(&self) -> Option<&TraceRecord> {
        match &self.output {
            Some(ItemOutput::Trace(trace)) => Some(trace),
            _ => None,
        }
    }

    /// Get the spans.
    #[must_use]
    pub fn spans(&self) -> &[SpanRecord] {
        &self.spans
    }

    /// Get the feedback scores.
    #[must_use]
    pub fn feedback_scores(&self) -> &[FeedbackScore] {
        &self.feedback_scores
    }

    /// Attach a feedback score.
    pub fn add_feedback_score(&mut self, score: FeedbackScore) {
        self.feedback_scores.push(score);
    }

    pub(crate) fn validate(&self) -> crate::Result<()> {
        if let Some(reason) = self.feedback_scores.iter().find_map(FeedbackScore::problem) {
            return Err(Error::InvalidFeedbackScore {
                item: self.dataset_item_id,
                reason,
            });
        }
        if let Some(trace) = self.trace() {
            if !trace.has_valid_range() {
                return Err(Error::InvalidTimeRange {
                    item: self.dataset_item_id,
                    context: "trace".to_string(),
                });
            }
        }
        if let Some(span) = self.spans.iter().find(|s| !s.has_valid_range()) {
            return Err(Error::InvalidTimeRange {
                item: self.dataset_item_id,
                context: format!("span {}", span.name().unwrap_or("<unnamed>")),
            });
        }
        Ok(())
    }
}

impl Serialize for ExperimentItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        ItemWireRef::from(self).serialize(serializer)
    }
}

/// Builder for `ExperimentItem`.
#[derive(Debug)]
pub struct ExperimentItemBuilder {
    item: ExperimentItem,
}

impl ExperimentItemBuilder {
    /// Create a new builder with the required dataset item ID.
    #[must_use]
    pub const fn new(dataset_item_id: Uuid) -> Self {
        Self {
            item: ExperimentItem::new(dataset_item_id),
        }
    }

    /// Record a raw task result, replacing any trace.
    #[must_use]
    pub fn task_result(mut self, result: impl Into<TaskResult>) -> Self {
        self.item.output = Some(ItemOutput::TaskResult(result.into()));
        self
    }

    /// Record a trace, replacing any task result.
    #[must_use]
    pub fn trace(mut self, trace: TraceRecord) -> Self {
        self.item.output = Some(ItemOutput::Trace(trace));
        self
    }

    /// Add a span.
    #[must_use]
    pub fn span(mut self, span: SpanRecord) -> Self {
        self.item.spans.push(span);
        self
    }

    /// Add a feedback score.
    #[must_use]
    pub fn feedback_score(mut self, score: FeedbackScore) -> Self {
        self.item.feedback_scores.push(score);
        self
    }

    /// Build the `ExperimentItem`.
    #[must_use]
    pub fn build(self) -> ExperimentItem {
        self.item
    }
}

#[derive(Serialize)]
struct ItemWireRef<'a> {
    dataset_item_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluate_task_result: Option<&'a TaskResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<&'a TraceRecord>,
    #[serde(skip_serializing_if = "is_empty_slice")]
    spans: &'a [SpanRecord],
    #[serde(skip_serializing_if = "is_empty_slice")]
    feedback_scores: &'a [FeedbackScore],
}

impl<'a> From<&'a ExperimentItem> for ItemWireRef<'a> {
    fn from(item: &'a ExperimentItem) -> Self {
        Self {
            dataset_item_id: item.dataset_item_id,
            evaluate_task_result: item.task_result(),
            trace: item.trace(),
            spans: &item.spans,
            feedback_scores: &item.feedback_scores,
        }
    }
}

fn is_empty_slice<T>(items: &&[T]) -> bool {
    items.is_empty()
}

#[derive(Deserialize)]
struct ItemWire {
    dataset_item_id: Uuid,
    #[serde(default)]
    evaluate_task_result: Option<TaskResult>,
    #[serde(default)]
    trace: Option<TraceRecord>,
    #[serde(default)]
    spans: Vec<SpanRecord>,
    #[serde(default)]
    feedback_scores: Vec<FeedbackScore>,
}

impl TryFrom<ItemWire> for ExperimentItem {
    type Error = Error;

    fn try_from(wire: ItemWire) -> std::result::Result<Self, Error> {
        let output = match (wire.evaluate_task_result, wire.trace) {
            (Some(_), Some(_)) => return Err(Error::ConflictingItemOutput(wire.dataset_item_id)),
            (Some(result), None) => Some(ItemOutput::TaskResult(result)),
            (None, Some(trace)) => Some(ItemOutput::Trace(trace)),
            (None, None) => None,
        };
        Ok(Self {
            dataset_item_id: wire.dataset_item_id,
            output,
            spans: wire.spans,
            feedback_scores: wire.feedback_scores,
        })
    }
}
