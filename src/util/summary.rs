//! Log-safe summaries of task arguments and results.
//!
//! Arguments can be arbitrarily large (account lists, mutation payloads), so
//! logs and failure records carry a bounded shape instead of the full value.

use serde::Serialize;
use serde_json::{json, Value};

/// Longest string kept verbatim in a result summary.
pub const MAX_SUMMARY_STR: usize = 2000;

const SAMPLE_LEN: usize = 3;
const ARG_KEYS: usize = 10;
const RESULT_KEYS: usize = 20;

/// Summarise task arguments for logs and failure reports.
///
/// Scalars are kept. A top-level array is treated as the argument tuple and
/// each element is summarised; any other value is summarised as a single
/// argument.
#[must_use]
pub fn summarize_args<A: Serialize + ?Sized>(args: &A) -> Value {
    match serde_json::to_value(args) {
        Ok(Value::Array(items)) => {
            Value::Array(items.iter().map(|item| summarize(item, ARG_KEYS, None)).collect())
        }
        Ok(value) => summarize(&value, ARG_KEYS, None),
        Err(err) => json!({ "type": "unserializable", "error": err.to_string() }),
    }
}

/// Summarise an operation result, truncating long strings.
#[must_use]
pub fn summarize_result<R: Serialize + ?Sized>(result: &R) -> Value {
    match serde_json::to_value(result) {
        Ok(value) => summarize(&value, RESULT_KEYS, Some(MAX_SUMMARY_STR)),
        Err(err) => json!({ "type": "unserializable", "error": err.to_string() }),
    }
}

fn summarize(value: &Value, max_keys: usize, max_str: Option<usize>) -> Value {
    match value {
        Value::String(s) => match max_str {
            Some(limit) if s.chars().count() > limit => {
                let truncated: String = s.chars().take(limit).collect();
                Value::String(format!("{truncated}...(truncated)"))
            }
            _ => value.clone(),
        },
        Value::Array(items) => json!({
            "type": "list",
            "length": items.len(),
            "sample": items.iter().take(SAMPLE_LEN).cloned().collect::<Vec<_>>(),
        }),
        Value::Object(map) => json!({
            "type": "dict",
            "keys": map.keys().take(max_keys).cloned().collect::<Vec<_>>(),
        }),
        _ => value.clone(),
    }
}
