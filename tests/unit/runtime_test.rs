//! Tests for response shaping helpers

use fanout_executor::core::{Outcome, ReportStatus, TaskTimeout};
use fanout_executor::runtime::{failure_reports, format_hms, with_meta};
use serde_json::json;
use std::time::{Duration, Instant};

#[test]
fn test_failure_reports_skip_successes() {
    let outcomes = vec![
        Outcome::Success("ok"),
        Outcome::Timeout(TaskTimeout {
            index: 1,
            name: "fetch_ads".to_string(),
            args: json!(["123"]),
            attempts: 2,
            timeout_ms: 60_000,
        }),
        Outcome::Success("ok"),
    ];

    let reports = failure_reports(&outcomes);

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].index, 1);
    assert_eq!(reports[0].status, ReportStatus::Timeout);
    assert_eq!(reports[0].error, "Timeout after 60s");
    let body = serde_json::to_value(&reports).unwrap();
    assert_eq!(body[0]["status"], "timeout");
    assert_eq!(body[0]["name"], "fetch_ads");
}

#[test]
fn test_with_meta_measures_duration() {
    let started = Instant::now();
    std::thread::sleep(Duration::from_millis(20));
    let envelope = with_meta(vec![1, 2, 3], started, "dashboard");

    assert!(envelope.meta.duration_ms >= 20);
    assert!(envelope.meta.timestamp_ms > 0);
    assert_eq!(envelope.meta.client_id, "dashboard");
    assert_eq!(envelope.data, vec![1, 2, 3]);
}

#[test]
fn test_format_hms_rounds_down_to_millis() {
    assert_eq!(format_hms(Duration::from_micros(1_999)), "00:00:00.001");
    assert_eq!(format_hms(Duration::from_secs(59 * 60 + 59)), "00:59:59.000");
}
