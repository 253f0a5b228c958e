//! Tests for configuration validation and loading

use fanout_executor::config::{ExecutorConfig, RunOptions};
use fanout_executor::core::RateWindow;
use std::collections::HashMap;
use std::time::Duration;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn test_defaults() {
    let cfg = ExecutorConfig::default();
    assert_eq!(cfg.max_workers, 8);
    assert_eq!(cfg.max_retries, 3);
    assert_eq!(cfg.initial_backoff(), Duration::from_secs(1));
    assert_eq!(cfg.max_backoff(), Duration::from_secs(10));
    assert_eq!(cfg.task_timeout(), Duration::from_secs(60));
    assert_eq!(cfg.jitter_min(), Duration::from_millis(100));
    assert_eq!(cfg.jitter_max(), Duration::from_millis(500));
    assert_eq!(cfg.rate_limit, 5);
    assert_eq!(cfg.rate_interval(), Duration::from_secs(1));
    assert_eq!(cfg.rate_window, RateWindow::Fixed);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_validation_rejects_zero_workers_and_retries() {
    assert!(ExecutorConfig::new().with_max_workers(0).validate().is_err());
    assert!(ExecutorConfig::new().with_max_retries(0).validate().is_err());
    assert!(ExecutorConfig::new()
        .with_task_timeout(Duration::ZERO)
        .validate()
        .is_err());
}

#[test]
fn test_validation_rejects_inverted_bounds() {
    let cfg = ExecutorConfig::new().with_backoff(Duration::from_secs(5), Duration::from_secs(1));
    assert!(cfg.validate().unwrap_err().contains("initial_backoff_ms"));

    let cfg = ExecutorConfig::new().with_jitter(Duration::from_millis(500), Duration::from_millis(100));
    assert!(cfg.validate().unwrap_err().contains("jitter_min_ms"));

    // A zero upper bound disables jitter regardless of the lower bound.
    let cfg = ExecutorConfig::new().with_jitter(Duration::from_millis(500), Duration::ZERO);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_validation_rejects_rate_limit_without_interval() {
    let cfg = ExecutorConfig::new().with_rate_limit(5, Duration::ZERO);
    assert!(cfg.validate().is_err());
    let cfg = ExecutorConfig::new().with_rate_limit(0, Duration::ZERO);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_from_json_fills_missing_fields() {
    let cfg = ExecutorConfig::from_json_str(
        r#"{"max_workers": 2, "rate_window": "sliding", "task_timeout_ms": 1500}"#,
    )
    .unwrap();
    assert_eq!(cfg.max_workers, 2);
    assert_eq!(cfg.rate_window, RateWindow::Sliding);
    assert_eq!(cfg.task_timeout(), Duration::from_millis(1500));
    assert_eq!(cfg.max_retries, 3);
}

#[test]
fn test_from_json_rejects_invalid() {
    assert!(ExecutorConfig::from_json_str(r#"{"max_workers": 0}"#).is_err());
    let err = ExecutorConfig::from_json_str("not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_from_lookup_reads_parallel_variables() {
    let cfg = ExecutorConfig::from_lookup(lookup(&[
        ("PARALLEL_MAX_WORKERS", "16"),
        ("PARALLEL_MAX_RETRIES", " 5 "),
        ("PARALLEL_TASK_TIMEOUT_MS", "30000"),
        ("PARALLEL_RATE_LIMIT", "0"),
        ("PARALLEL_RATE_WINDOW", "Sliding"),
    ]))
    .unwrap();
    assert_eq!(cfg.max_workers, 16);
    assert_eq!(cfg.max_retries, 5);
    assert_eq!(cfg.task_timeout(), Duration::from_secs(30));
    assert_eq!(cfg.rate_limit, 0);
    assert_eq!(cfg.rate_window, RateWindow::Sliding);
    assert_eq!(cfg.initial_backoff_ms, 1_000);
}

#[test]
fn test_from_lookup_names_bad_variable() {
    let err = ExecutorConfig::from_lookup(lookup(&[("PARALLEL_MAX_WORKERS", "many")])).unwrap_err();
    assert!(err.starts_with("PARALLEL_MAX_WORKERS"));

    let err = ExecutorConfig::from_lookup(lookup(&[("PARALLEL_RATE_WINDOW", "leaky")])).unwrap_err();
    assert!(err.contains("leaky"));

    let err = ExecutorConfig::from_lookup(lookup(&[("PARALLEL_MAX_RETRIES", "0")])).unwrap_err();
    assert!(err.contains("max_retries"));
}

#[test]
fn test_run_options() {
    let opts = RunOptions::default();
    assert_eq!(opts.api_name, "default");
    assert_eq!(opts.max_workers, None);

    let opts = RunOptions::new("meta_ads")
        .with_max_workers(2)
        .with_max_retries(1)
        .with_task_timeout(Duration::from_secs(3));
    assert_eq!(opts.api_name, "meta_ads");
    assert_eq!(opts.max_workers, Some(2));
    assert_eq!(opts.max_retries, Some(1));
    assert_eq!(opts.task_timeout, Some(Duration::from_secs(3)));
}
