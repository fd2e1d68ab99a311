//! Experiment Item Wire Schema Tests
//!
//! Checks that typed records serialize to the JSON body the bulk endpoint
//! expects, and that invalid bodies are refused on the way in.

use chrono::{TimeZone, Utc};
use opik_bulk::experiment::{
    ErrorInfo, ExperimentBatch, ExperimentItem, FeedbackScore, ItemOutput, ScoreSource,
    SpanRecord, SpanType, TaskResult, TraceRecord,
};
use opik_bulk::Error;
use serde_json::json;
use uuid::Uuid;

const ITEM_A: &str = "0193e1e2-6f4e-7b8a-9c4d-1a2b3c4d5e6f";
const ITEM_B: &str = "0193e1e2-6f4e-7b8a-9c4d-1a2b3c4d5e70";

fn id(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap()
}

// =============================================================================
// ExperimentBatch Tests
// =============================================================================

#[test]
fn test_minimal_batch_body() {
    let batch = ExperimentBatch::builder("my-experiment", "my-dataset")
        .item(ExperimentItem::new(id(ITEM_A)))
        .build();

    let body: serde_json::Value = serde_json::from_slice(&batch.encode().unwrap()).unwrap();
    assert_eq!(
        body,
        json!({
            "experiment_name": "my-experiment",
            "dataset_name": "my-dataset",
            "items": [{"dataset_item_id": ITEM_A}]
        })
    );
}

#[test]
fn test_documented_example_body_parses() {
    let body = json!({
        "experiment_name": "my-experiment",
        "dataset_name": "my-dataset",
        "items": [
            {
                "dataset_item_id": ITEM_A,
                "evaluate_task_result": {"output": "Paris"},
                "feedback_scores": [
                    {
                        "name": "accuracy",
                        "category_name": "quality",
                        "value": 1,
                        "reason": "exact match",
                        "source": "sdk"
                    }
                ]
            },
            {
                "dataset_item_id": ITEM_B,
                "trace": {
                    "name": "qa",
                    "start_time": "2025-01-15T12:00:00Z",
                    "end_time": "2025-01-15T12:00:02Z",
                    "input": {"question": "capital of France?"},
                    "output": {"answer": "Paris"}
                },
                "spans": [
                    {
                        "name": "llm-call",
                        "type": "llm",
                        "start_time": "2025-01-15T12:00:00Z",
                        "end_time": "2025-01-15T12:00:01Z",
                        "usage": {"prompt_tokens": 10, "completion_tokens": 2}
                    }
                ]
            }
        ]
    });

    let batch = ExperimentBatch::decode(body.to_string().as_bytes()).unwrap();
    assert!(batch.validate().is_ok());
    assert_eq!(batch.len(), 2);

    let first = &batch.items()[0];
    assert!(matches!(first.output(), Some(ItemOutput::TaskResult(TaskResult::Object(_)))));
    let score = &first.feedback_scores()[0];
    assert_eq!(score.name(), "accuracy");
    assert_eq!(score.category_name(), Some("quality"));
    assert!((score.value() - 1.0).abs() < f64::EPSILON);
    assert_eq!(score.source(), ScoreSource::Sdk);

    let second = &batch.items()[1];
    assert_eq!(second.trace().unwrap().name(), Some("qa"));
    assert_eq!(second.spans()[0].span_type(), SpanType::Llm);
    assert_eq!(second.spans()[0].usage()["completion_tokens"], 2);
}

#[test]
fn test_both_task_result_and_trace_rejected() {
    let body = json!({
        "experiment_name": "e",
        "dataset_name": "d",
        "items": [{
            "dataset_item_id": ITEM_A,
            "evaluate_task_result": "Paris",
            "trace": {"start_time": "2025-01-15T12:00:00Z"}
        }]
    });

    let err = ExperimentBatch::decode(body.to_string().as_bytes()).unwrap_err();
    assert!(matches!(err, Error::Json(_)));
    assert!(err.to_string().contains(ITEM_A));
}

#[test]
fn test_missing_required_fields_rejected() {
    for body in [
        json!({"dataset_name": "d", "items": [{"dataset_item_id": ITEM_A}]}),
        json!({"experiment_name": "e", "items": [{"dataset_item_id": ITEM_A}]}),
        json!({"experiment_name": "e", "dataset_name": "d"}),
        json!({"experiment_name": "e", "dataset_name": "d", "items": [{}]}),
    ] {
        assert!(
            ExperimentBatch::decode(body.to_string().as_bytes()).is_err(),
            "accepted {body}"
        );
    }
}

#[test]
fn test_task_result_variants() {
    for (value, expected) in [
        (json!({"k": "v"}), "object"),
        (json!([1, 2, 3]), "array"),
        (json!("plain"), "text"),
    ] {
        let result = TaskResult::try_from(value.clone()).unwrap();
        let kind = match result {
            TaskResult::Object(_) => "object",
            TaskResult::Array(_) => "array",
            TaskResult::Text(_) => "text",
        };
        assert_eq!(kind, expected);

        let item = ExperimentItem::builder(id(ITEM_A)).task_result(result).build();
        assert_eq!(serde_json::to_value(&item).unwrap()["evaluate_task_result"], value);
    }

    assert!(TaskResult::try_from(json!(null)).is_err());
    assert!(TaskResult::try_from(json!(true)).is_err());
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_distinct_ids_valid_together() {
    let batch = ExperimentBatch::builder("e", "d")
        .items((0..50).map(|_| ExperimentItem::new(Uuid::new_v4())))
        .build();
    assert!(batch.validate().is_ok());
}

#[test]
fn test_duplicate_ids_invalid() {
    let batch = ExperimentBatch::builder("e", "d")
        .item(ExperimentItem::new(id(ITEM_A)))
        .item(ExperimentItem::new(id(ITEM_B)))
        .item(ExperimentItem::new(id(ITEM_A)))
        .build();
    assert!(matches!(batch.validate(), Err(Error::DuplicateItemId(dup)) if dup == id(ITEM_A)));
}

#[test]
fn test_non_finite_score_invalid() {
    let batch = ExperimentBatch::builder("e", "d")
        .item(
            ExperimentItem::builder(id(ITEM_A))
                .feedback_score(FeedbackScore::new("latency", f64::INFINITY))
                .build(),
        )
        .build();
    assert!(matches!(
        batch.validate(),
        Err(Error::InvalidFeedbackScore { item, .. }) if item == id(ITEM_A)
    ));
}

#[test]
fn test_span_ending_before_start_invalid() {
    let start = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 1, 15, 11, 59, 59).unwrap();
    let batch = ExperimentBatch::builder("e", "d")
        .item(
            ExperimentItem::builder(id(ITEM_A))
                .span(SpanRecord::builder("retrieve").start_time(start).end_time(end).build())
                .build(),
        )
        .build();

    match batch.validate() {
        Err(Error::InvalidTimeRange { context, .. }) => assert_eq!(context, "span retrieve"),
        other => panic!("expected InvalidTimeRange, got {other:?}"),
    }
}

// =============================================================================
// Trace / Span Tests
// =============================================================================

#[test]
fn test_trace_item_serialization() {
    let start = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
    let trace = TraceRecord::builder()
        .name("qa")
        .start_time(start)
        .input(json!({"q": "?"}))
        .tag("eval")
        .error_info(ErrorInfo {
            exception_type: "TimeoutError".to_string(),
            message: Some("model timed out".to_string()),
            traceback: "at line 1".to_string(),
        })
        .build();

    let item = ExperimentItem::builder(id(ITEM_A)).trace(trace).build();
    let json = serde_json::to_value(&item).unwrap();

    assert!(json.get("evaluate_task_result").is_none());
    assert_eq!(json["trace"]["name"], "qa");
    assert_eq!(json["trace"]["start_time"], "2025-01-15T12:00:00Z");
    assert_eq!(json["trace"]["tags"], json!(["eval"]));
    assert_eq!(json["trace"]["error_info"]["exception_type"], "TimeoutError");
    assert!(json["trace"].get("end_time").is_none());
}

#[test]
fn test_span_tree_ids() {
    let trace_id = Uuid::new_v4();
    let parent = Uuid::new_v4();
    let span = SpanRecord::builder("tool")
        .span_type(SpanType::Tool)
        .trace_id(trace_id)
        .parent_span_id(parent)
        .total_estimated_cost(0.002)
        .build();

    assert_eq!(span.trace_id(), Some(trace_id));
    assert_eq!(span.parent_span_id(), Some(parent));

    let back: SpanRecord = serde_json::from_value(serde_json::to_value(&span).unwrap()).unwrap();
    assert_eq!(back, span);
}

#[test]
fn test_feedback_score_sources() {
    for (source, text) in [
        (ScoreSource::Sdk, "sdk"),
        (ScoreSource::Ui, "ui"),
        (ScoreSource::OnlineScoring, "online_scoring"),
    ] {
        let score = FeedbackScore::builder("m", 0.0).source(source).build();
        assert_eq!(serde_json::to_value(&score).unwrap()["source"], text);
    }
}

#[test]
fn test_feedback_score_source_defaults_to_sdk() {
    let score: FeedbackScore = serde_json::from_value(json!({"name": "m", "value": 0.25})).unwrap();
    assert_eq!(score.source(), ScoreSource::Sdk);
    assert!(score.reason().is_none());
}
