//! Tests for error types

use opik_bulk::Error;
use uuid::Uuid;

#[test]
fn test_empty_field_error() {
    let error = Error::EmptyField("experiment_name");
    let error_str = format!("{error}");
    assert!(error_str.contains("experiment_name"));
    assert!(error_str.contains("must not be empty"));
}

#[test]
fn test_empty_batch_error() {
    let error_str = format!("{}", Error::EmptyBatch);
    assert!(error_str.contains("no items"));
    assert!(error_str.contains("at least one item"));
}

#[test]
fn test_duplicate_item_error() {
    let id = Uuid::nil();
    let error_str = format!("{}", Error::DuplicateItemId(id));
    assert!(error_str.contains("00000000-0000-0000-0000-000000000000"));
}

#[test]
fn test_conflicting_output_error() {
    let error_str = format!("{}", Error::ConflictingItemOutput(Uuid::nil()));
    assert!(error_str.contains("evaluate_task_result"));
    assert!(error_str.contains("trace"));
    assert!(error_str.contains("exactly one"));
}

#[test]
fn test_payload_too_large_error() {
    let error = Error::PayloadTooLarge {
        size: 5_000_000,
        max: 4_194_304,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("5000000"));
    assert!(error_str.contains("4194304"));
    assert!(error_str.contains("Split the batch"));
}

#[test]
fn test_api_error() {
    let error = Error::Api {
        status: 409,
        body: r#"{"errors":["conflict"]}"#.to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("HTTP 409"));
    assert!(error_str.contains("conflict"));
    assert_eq!(error.status(), Some(409));
    assert!(!error.is_retryable());
}

#[test]
fn test_chunk_failed_source_chain() {
    use std::error::Error as _;

    let error = Error::ChunkFailed {
        chunk: 3,
        items_accepted: 300,
        source: Box::new(Error::Api {
            status: 502,
            body: "bad gateway".to_string(),
        }),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Chunk 3"));
    assert!(error_str.contains("300 items"));
    assert!(error.source().is_some());
    assert!(error.is_retryable());
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").contains("JSON error"));
}

#[test]
fn test_url_error_conversion() {
    let url_error = url::Url::parse("no scheme").unwrap_err();
    let error: Error = url_error.into();
    assert!(format!("{error}").contains("Invalid URL"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
}

#[test]
fn test_config_error() {
    let error = Error::Config("timeout must be greater than zero".to_string());
    assert_eq!(
        format!("{error}"),
        "Configuration error: timeout must be greater than zero"
    );
    assert!(!error.is_retryable());
}

#[test]
fn test_error_debug() {
    let error = Error::EmptyBatch;
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("EmptyBatch"));
}

#[test]
fn test_result_type_alias_error() {
    fn returns_error() -> opik_bulk::Result<i32> {
        Err(Error::EmptyBatch)
    }

    let result = returns_error();
    assert!(result.is_err());
}
