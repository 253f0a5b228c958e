//! Tests for builder modules

use fanout_executor::builders::ExecutorBuilder;
use fanout_executor::config::ExecutorConfig;
use fanout_executor::core::{ExecutorError, RateLimiter, RateWindow};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_builder_defaults() {
    let executor = ExecutorBuilder::new().build().unwrap();
    assert_eq!(executor.config(), &ExecutorConfig::default());
    assert_eq!(executor.rate_limiter().limit(), 5);
    assert_eq!(executor.rate_limiter().interval(), Duration::from_secs(1));
}

#[test]
fn test_builder_rejects_invalid_config() {
    let err = ExecutorBuilder::from_config(ExecutorConfig::new().with_max_retries(0))
        .build()
        .unwrap_err();
    assert!(matches!(err, ExecutorError::InvalidArgument(ref msg) if msg.contains("max_retries")));
}

#[test]
fn test_builder_shares_rate_limiter() {
    let limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(60), RateWindow::Sliding));
    let executor = ExecutorBuilder::new()
        .with_rate_limiter(Arc::clone(&limiter))
        .build()
        .unwrap();
    assert!(Arc::ptr_eq(executor.rate_limiter(), &limiter));

    assert!(executor.rate_limiter().try_acquire().is_ok());
    assert!(limiter.try_acquire().is_err());
}

#[test]
fn test_builder_limiter_follows_config() {
    let config = ExecutorConfig::new().with_rate_limit(0, Duration::ZERO);
    let executor = ExecutorBuilder::from_config(config).build().unwrap();
    assert!(!executor.rate_limiter().is_enabled());
}
