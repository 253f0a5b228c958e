//! Response-facing helpers for HTTP handlers built on the executor.
//!
//! Whether a batch with failures maps to a 200 with a report or to a 5xx is
//! left to the handler; these helpers only shape the data.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::{Outcome, TaskReport};
use crate::util::clock::now_ms;

/// Timing and caller metadata attached to a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Response time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Handler duration in whole milliseconds.
    pub duration_ms: u64,
    /// Handler duration as `HH:MM:SS.mmm`.
    pub duration_hms: String,
    /// Caller identifier.
    pub client_id: String,
}

/// `{ "meta": ..., "data": ... }` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    /// Timing metadata.
    pub meta: ResponseMeta,
    /// Response payload.
    pub data: T,
}

/// Wrap `data` with timing measured from `started`.
pub fn with_meta<T>(data: T, started: Instant, client_id: impl Into<String>) -> ResponseEnvelope<T> {
    let duration = started.elapsed();
    ResponseEnvelope {
        meta: ResponseMeta {
            timestamp_ms: now_ms(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            duration_hms: format_hms(duration),
            client_id: client_id.into(),
        },
        data,
    }
}

/// Format a duration as `HH:MM:SS.mmm`. Hours are not wrapped at 24.
#[must_use]
pub fn format_hms(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let (secs, ms) = (total_ms / 1000, total_ms % 1000);
    let (mins, secs) = (secs / 60, secs % 60);
    let (hours, mins) = (mins / 60, mins % 60);
    format!("{hours:02}:{mins:02}:{secs:02}.{ms:03}")
}

/// Reports of every unsuccessful task, in submission order.
pub fn failure_reports<T>(outcomes: &[Outcome<T>]) -> Vec<TaskReport> {
    outcomes.iter().filter_map(Outcome::report).collect()
}

/// Concatenate list-valued successes in submission order.
///
/// Unsuccessful tasks contribute nothing to the items; their reports are
/// returned alongside so the handler can decide how to surface them.
pub fn flatten_successes<T>(outcomes: Vec<Outcome<Vec<T>>>) -> (Vec<T>, Vec<TaskReport>) {
    let mut items = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        if let Some(report) = outcome.report() {
            failures.push(report);
        } else if let Outcome::Success(values) = outcome {
            items.extend(values);
        }
    }
    (items, failures)
}
