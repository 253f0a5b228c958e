//! Builder wiring an [`Executor`] to its rate limiter and metrics sink.

use std::sync::Arc;

use crate::config::ExecutorConfig;
use crate::core::{Executor, ExecutorError, MetricsSink, NoopMetrics, RateLimiter};

/// Assembles an [`Executor`] from configuration and optional shared parts.
///
/// Passing the same `Arc<RateLimiter>` to several builders makes their
/// executors draw from one permit budget, e.g. one limiter per upstream API.
pub struct ExecutorBuilder {
    config: ExecutorConfig,
    limiter: Option<Arc<RateLimiter>>,
    metrics: Arc<dyn MetricsSink>,
}

impl ExecutorBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(ExecutorConfig::default())
    }

    /// Start from an explicit configuration.
    #[must_use]
    pub fn from_config(config: ExecutorConfig) -> Self {
        Self {
            config,
            limiter: None,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Report task counters and timings into `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Share an existing rate limiter instead of building one from the config.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Validate the configuration and build the executor.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::InvalidArgument` if the configuration is invalid.
    pub fn build(self) -> Result<Executor, ExecutorError> {
        self.config
            .validate()
            .map_err(|e| ExecutorError::InvalidArgument(format!("config invalid: {e}")))?;
        let limiter = self.limiter.unwrap_or_else(|| {
            Arc::new(RateLimiter::new(
                self.config.rate_limit,
                self.config.rate_interval(),
                self.config.rate_window,
            ))
        });
        Ok(Executor::from_parts(self.config, limiter, self.metrics))
    }
}

impl Default for ExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
