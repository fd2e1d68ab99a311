//! Feedback Score - evaluation signal attached to an experiment item

use serde::{Deserialize, Serialize};

/// Origin of a feedback score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Logged programmatically (evaluation runs).
    #[default]
    Sdk,
    /// Entered by a human in the UI.
    Ui,
    /// Produced by an online evaluation rule.
    OnlineScoring,
}

/// Feedback Score represents one metric value for an experiment item.
///
/// Scores are identified by `name` (e.g. "hallucination", "answer_relevance");
/// `category_name` and `reason` are optional annotations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackScore {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category_name: Option<String>,
    value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(default)]
    source: ScoreSource,
}

impl FeedbackScore {
    /// Create a new SDK-sourced feedback score.
    ///
    /// # Arguments
    ///
    /// * `name` - Metric name
    /// * `value` - Metric value
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            category_name: None,
            value,
            reason: None,
            source: ScoreSource::Sdk,
        }
    }

    /// Create a builder for constructing a feedback score with optional fields.
    #[must_use]
    pub fn builder(name: impl Into<String>, value: f64) -> FeedbackScoreBuilder {
        FeedbackScoreBuilder::new(name, value)
    }

    /// Get the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the category name, if any.
    #[must_use]
    pub fn category_name(&self) -> Option<&str> {
        self.category_name.as_deref()
    }

    /// Get the metric value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Get the reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Get the score source.
    #[must_use]
    pub const fn source(&self) -> ScoreSource {
        self.source
    }

    /// Why this score would be rejected, if it would be.
    pub(crate) fn problem(&self) -> Option<String> {
        if self.name.trim().is_empty() {
            return Some("name must not be empty".to_string());
        }
        if !self.value.is_finite() {
            return Some(format!("`{}` has non-finite value {}", self.name, self.value));
        }
        None
    }
}

/// Builder for `FeedbackScore`.
#[derive(Debug)]
pub struct FeedbackScoreBuilder {
    score: FeedbackScore,
}

impl FeedbackScoreBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            score: FeedbackScore::new(name, value),
        }
    }

    /// Set the category name.
    #[must_use]
    pub fn category_name(mut self, category: impl Into<String>) -> Self {
        self.score.category_name = Some(category.into());
        self
    }

    /// Set the reason.
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.score.reason = Some(reason.into());
        self
    }

    /// Set the source.
    #[must_use]
    pub const fn source(mut self, source: ScoreSource) -> Self {
        self.score.source = source;
        self
    }

    /// Build the `FeedbackScore`.
    #[must_use]
    pub fn build(self) -> FeedbackScore {
        self.score
    }
}
