//! Tests for error types

use fanout_executor::core::{ExecutorError, Outcome, TaskError, TaskFailure, TaskTimeout};
use serde_json::json;

#[test]
fn test_invalid_argument_error() {
    let err = ExecutorError::InvalidArgument("max_workers must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid argument: max_workers must be greater than 0"
    );
}

#[test]
fn test_internal_error() {
    let err = ExecutorError::Internal("failed to spawn worker thread 0".to_string());
    assert_eq!(format!("{}", err), "internal error: failed to spawn worker thread 0");
}

#[test]
fn test_task_failure_display() {
    let failure = TaskFailure {
        index: 2,
        name: "update_budget".to_string(),
        args: json!(["123", 50]),
        attempts: 3,
        message: "quota exceeded".to_string(),
    };
    assert_eq!(
        format!("{}", failure),
        "task #2 `update_budget` failed after 3 attempt(s): quota exceeded"
    );
}

#[test]
fn test_task_error_is_transparent() {
    let timeout = TaskTimeout {
        index: 0,
        name: "fetch".to_string(),
        args: json!([]),
        attempts: 1,
        timeout_ms: 250,
    };
    let err: TaskError = Outcome::<()>::Timeout(timeout.clone()).into_result().unwrap_err();
    assert_eq!(err.to_string(), timeout.to_string());
    assert!(err.to_string().contains("timed out after 250ms"));
}

#[test]
fn test_task_error_converts_into_anyhow() {
    let failure = TaskFailure {
        index: 0,
        name: "fetch".to_string(),
        args: json!([]),
        attempts: 1,
        message: "404".to_string(),
    };
    let err: anyhow::Error = TaskError::from(failure).into();
    assert!(err.downcast_ref::<TaskError>().is_some());
}
