//! Trace and Span Records - execution records attached to an item

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Error details captured on a failed trace or span.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Exception or error type name.
    pub exception_type: String,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Stack trace.
    pub traceback: String,
}

/// Kind of work a span represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanType {
    /// Generic step.
    #[default]
    General,
    /// Model call.
    Llm,
    /// Tool invocation.
    Tool,
    /// Guardrail check.
    Guardrail,
}

/// Trace Record describes one execution of the application under test.
///
/// Sent in place of a raw task result when the caller wants the full
/// execution recorded alongside the experiment item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_info: Option<ErrorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thread_id: Option<String>,
}

impl TraceRecord {
    /// Create a trace that started now.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for constructing a trace record.
    #[must_use]
    pub fn builder() -> TraceRecordBuilder {
        TraceRecordBuilder::default()
    }

    /// Get the trace ID, if assigned client-side.
    #[must_use]
    pub const fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// Get the trace name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the start timestamp.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Get the end timestamp.
    #[must_use]
    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Get the recorded input.
    #[must_use]
    pub const fn input(&self) -> Option<&Value> {
        self.input.as_ref()
    }

    /// Get the recorded output.
    #[must_use]
    pub const fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    /// Get the tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Get the error details, if the trace failed.
    #[must_use]
    pub const fn error_info(&self) -> Option<&ErrorInfo> {
        self.error_info.as_ref()
    }

    /// Get the conversation thread ID.
    #[must_use]
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Mark the trace as finished now.
    pub fn end(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub(crate) fn has_valid_range(&self) -> bool {
        self.end_time.map_or(true, |end| end >= self.start_time)
    }
}

impl Default for TraceRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TraceRecord`.
#[derive(Debug)]
pub struct TraceRecordBuilder {
    trace: TraceRecord,
}

impl Default for TraceRecordBuilder {
    fn default() -> Self {
        Self {
            trace: TraceRecord {
                id: None,
                name: None,
                start_time: Utc::now(),
                end_time: None,
                input: None,
                output: None,
                metadata: None,
                tags: Vec::new(),
                error_info: None,
                thread_id: None,
            },
        }
    }
}

impl TraceRecordBuilder {
    /// Set a client-side trace ID.
    #[must_use]
    pub const fn id(mut self, id: Uuid) -> Self {
        self.trace.id = Some(id);
        self
    }

    /// Set the trace name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.trace.name = Some(name.into());
        self
    }

    /// Set the start timestamp (defaults to now).
    #[must_use]
    pub const fn start_time(mut self, start: DateTime<Utc>) -> Self {
        self.trace.start_time = start;
        self
    }

    /// Set the end timestamp.
    #[must_use]
    pub const fn end_time(mut self, end: DateTime<Utc>) -> Self {
        self.trace.end_time = Some(end);
        self
    }

    /// Set the input payload.
    #[must_use]
    pub fn input(mut self, input: Value) -> Self {
        self.trace.input = Some(input);
        self
    }

    /// Set the output payload.
    #[must_use]
    pub fn output(mut self, output: Value) -> Self {
        self.trace.output = Some(output);
        self
    }

    /// Set free-form metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.trace.metadata = Some(metadata);
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.trace.tags.push(tag.into());
        self
    }

    /// Attach error details.
    #[must_use]
    pub fn error_info(mut self, error: ErrorInfo) -> Self {
        self.trace.error_info = Some(error);
        self
    }

    /// Set the conversation thread ID.
    #[must_use]
    pub fn thread_id(mut self, thread: impl Into<String>) -> Self {
        self.trace.thread_id = Some(thread.into());
        self
    }

    /// Build the `TraceRecord`.
    #[must_use]
    pub fn build(self) -> TraceRecord {
        self.trace
    }
}

/// Span Record describes one step inside a trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trace_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_span_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "type", default)]
    span_type: SpanType,
    start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    usage: BTreeMap<String, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total_estimated_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_info: Option<ErrorInfo>,
}

impl SpanRecord {
    /// Create a general span that started now.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    /// Create a builder for constructing a span record.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SpanRecordBuilder {
        SpanRecordBuilder::new(name)
    }

    /// Get the span ID, if assigned client-side.
    #[must_use]
    pub const fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// Get the owning trace ID.
    #[must_use]
    pub const fn trace_id(&self) -> Option<Uuid> {
        self.trace_id
    }

    /// Get the parent span ID.
    #[must_use]
    pub const fn parent_span_id(&self) -> Option<Uuid> {
        self.parent_span_id
    }

    /// Get the span name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the span type.
    #[must_use]
    pub const fn span_type(&self) -> SpanType {
        self.span_type
    }

    /// Get the start timestamp.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Get the end timestamp.
    #[must_use]
    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Get token usage counters.
    #[must_use]
    pub const fn usage(&self) -> &BTreeMap<String, i64> {
        &self.usage
    }

    /// Get the model name.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Get the provider name.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Get the estimated cost.
    #[must_use]
    pub const fn total_estimated_cost(&self) -> Option<f64> {
        self.total_estimated_cost
    }

    /// Mark the span as finished now.
    pub fn end(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub(crate) fn has_valid_range(&self) -> bool {
        self.end_time.map_or(true, |end| end >= self.start_time)
    }
}

/// Builder for `SpanRecord`.
#[derive(Debug)]
pub struct SpanRecordBuilder {
    span: SpanRecord,
}

impl SpanRecordBuilder {
    /// Create a new builder for a named span starting now.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            span: SpanRecord {
                id: None,
                trace_id: None,
                parent_span_id: None,
                name: Some(name.into()),
                span_type: SpanType::General,
                start_time: Utc::now(),
                end_time: None,
                input: None,
                output: None,
                metadata: None,
                tags: Vec::new(),
                usage: BTreeMap::new(),
                model: None,
                provider: None,
                total_estimated_cost: None,
                error_info: None,
            },
        }
    }

    /// Set a client-side span ID.
    #[must_use]
    pub const fn id(mut self, id: Uuid) -> Self {
        self.span.id = Some(id);
        self
    }

    /// Set the owning trace ID.
    #[must_use]
    pub const fn trace_id(mut self, trace_id: Uuid) -> Self {
        self.span.trace_id = Some(trace_id);
        self
    }

    /// Set the parent span ID.
    #[must_use]
    pub const fn parent_span_id(mut self, parent: Uuid) -> Self {
        self.span.parent_span_id = Some(parent);
        self
    }

    /// Set the span type.
    #[must_use]
    pub const fn span_type(mut self, span_type: SpanType) -> Self {
        self.span.span_type = span_type;
        self
    }

    /// Set the start timestamp (defaults to now).
    #[must_use]
    pub const fn start_time(mut self, start: DateTime<Utc>) -> Self {
        self.span.start_time = start;
        self
    }

    /// Set the end timestamp.
    #[must_use]
    pub const fn end_time(mut self, end: DateTime<Utc>) -> Self {
        self.span.end_time = Some(end);
        self
    }

    /// Set the input payload.
    #[must_use]
    pub fn input(mut self, input: Value) -> Self {
        self.span.input = Some(input);
        self
    }

    /// Set the output payload.
    #[must_use]
    pub fn output(mut self, output: Value) -> Self {
        self.span.output = Some(output);
        self
    }

    /// Set free-form metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.span.metadata = Some(metadata);
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.span.tags.push(tag.into());
        self
    }

    /// Record a usage counter (e.g. `prompt_tokens`).
    #[must_use]
    pub fn usage(mut self, key: impl Into<String>, count: i64) -> Self {
        self.span.usage.insert(key.into(), count);
        self
    }

    /// Set model and provider names.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>, provider: impl Into<String>) -> Self {
        self.span.model = Some(model.into());
        self.span.provider = Some(provider.into());
        self
    }

    /// Set the estimated cost.
    #[must_use]
    pub const fn total_estimated_cost(mut self, cost: f64) -> Self {
        self.span.total_estimated_cost = Some(cost);
        self
    }

    /// Attach error details.
    #[must_use]
    pub fn error_info(mut self, error: ErrorInfo) -> Self {
        self.span.error_info = Some(error);
        self
    }

    /// Build the `SpanRecord`.
    #[must_use]
    pub fn build(self) -> SpanRecord {
        self.span
    }
}
