//! Executor configuration and per-call run options.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::RateWindow;

/// Environment files checked by [`load_env_files`], first match wins.
pub const ENV_FILES: [&str; 2] = ["/etc/.env", "etc/.env"];

/// Executor configuration.
///
/// Durations are stored in milliseconds so the struct maps one-to-one onto
/// JSON documents and `PARALLEL_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Concurrent workers per batch.
    pub max_workers: usize,
    /// Attempts per task, including the first.
    pub max_retries: u32,
    /// Backoff after the first failed attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound for the backoff.
    pub max_backoff_ms: u64,
    /// Lower bound of the pre-attempt jitter.
    pub jitter_min_ms: u64,
    /// Upper bound of the pre-attempt jitter; 0 disables jitter.
    pub jitter_max_ms: u64,
    /// Wall-clock budget per task across all attempts.
    pub task_timeout_ms: u64,
    /// Permits per rate window; 0 disables rate limiting.
    pub rate_limit: u32,
    /// Length of the rate window.
    pub rate_interval_ms: u64,
    /// Rate window strategy.
    pub rate_window: RateWindow,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_workers: 8,
            max_retries: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 10_000,
            jitter_min_ms: 100,
            jitter_max_ms: 500,
            task_timeout_ms: 60_000,
            rate_limit: 5,
            rate_interval_ms: 1_000,
            rate_window: RateWindow::Fixed,
        }
    }
}

impl ExecutorConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Set the attempts per task.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff bounds.
    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff_ms = duration_ms(initial);
        self.max_backoff_ms = duration_ms(max);
        self
    }

    /// Set the jitter bounds.
    #[must_use]
    pub fn with_jitter(mut self, min: Duration, max: Duration) -> Self {
        self.jitter_min_ms = duration_ms(min);
        self.jitter_max_ms = duration_ms(max);
        self
    }

    /// Set the per-task budget.
    #[must_use]
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the rate limit; a `limit` of 0 disables it.
    #[must_use]
    pub fn with_rate_limit(mut self, limit: u32, interval: Duration) -> Self {
        self.rate_limit = limit;
        self.rate_interval_ms = duration_ms(interval);
        self
    }

    /// Set the rate window strategy.
    #[must_use]
    pub const fn with_rate_window(mut self, window: RateWindow) -> Self {
        self.rate_window = window;
        self
    }

    /// Backoff after the first failure.
    #[must_use]
    pub const fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Backoff ceiling.
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Jitter lower bound.
    #[must_use]
    pub const fn jitter_min(&self) -> Duration {
        Duration::from_millis(self.jitter_min_ms)
    }

    /// Jitter upper bound.
    #[must_use]
    pub const fn jitter_max(&self) -> Duration {
        Duration::from_millis(self.jitter_max_ms)
    }

    /// Per-task budget.
    #[must_use]
    pub const fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    /// Rate window length.
    #[must_use]
    pub const fn rate_interval(&self) -> Duration {
        Duration::from_millis(self.rate_interval_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers must be greater than 0".into());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be greater than 0".into());
        }
        if self.task_timeout_ms == 0 {
            return Err("task_timeout_ms must be greater than 0".into());
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(format!(
                "initial_backoff_ms ({}) must not exceed max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            ));
        }
        if self.jitter_min_ms > self.jitter_max_ms && self.jitter_max_ms > 0 {
            return Err(format!(
                "jitter_min_ms ({}) must not exceed jitter_max_ms ({})",
                self.jitter_min_ms, self.jitter_max_ms
            ));
        }
        if self.rate_limit > 0 && self.rate_interval_ms == 0 {
            return Err("rate_interval_ms must be greater than 0 when rate_limit is set".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `PARALLEL_*` environment variables.
    ///
    /// Unset variables keep their defaults. `.env` files are loaded first,
    /// see [`load_env_files`].
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse, or the
    /// validation failure.
    pub fn from_env() -> Result<Self, String> {
        load_env_files();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (environment-shaped).
    ///
    /// # Errors
    ///
    /// Same as [`ExecutorConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        read_var(&lookup, "PARALLEL_MAX_WORKERS", &mut cfg.max_workers)?;
        read_var(&lookup, "PARALLEL_MAX_RETRIES", &mut cfg.max_retries)?;
        read_var(&lookup, "PARALLEL_INITIAL_BACKOFF_MS", &mut cfg.initial_backoff_ms)?;
        read_var(&lookup, "PARALLEL_MAX_BACKOFF_MS", &mut cfg.max_backoff_ms)?;
        read_var(&lookup, "PARALLEL_JITTER_MIN_MS", &mut cfg.jitter_min_ms)?;
        read_var(&lookup, "PARALLEL_JITTER_MAX_MS", &mut cfg.jitter_max_ms)?;
        read_var(&lookup, "PARALLEL_TASK_TIMEOUT_MS", &mut cfg.task_timeout_ms)?;
        read_var(&lookup, "PARALLEL_RATE_LIMIT", &mut cfg.rate_limit)?;
        read_var(&lookup, "PARALLEL_RATE_INTERVAL_MS", &mut cfg.rate_interval_ms)?;
        if let Some(raw) = lookup("PARALLEL_RATE_WINDOW") {
            cfg.rate_window = match raw.trim().to_ascii_lowercase().as_str() {
                "fixed" => RateWindow::Fixed,
                "sliding" => RateWindow::Sliding,
                other => return Err(format!("PARALLEL_RATE_WINDOW: unknown window `{other}`")),
            };
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn read_var<F, V>(lookup: &F, key: &str, target: &mut V) -> Result<(), String>
where
    F: Fn(&str) -> Option<String>,
    V: std::str::FromStr,
    V::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| format!("{key}: invalid value `{raw}`: {e}"))?;
    }
    Ok(())
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Load the first existing file of [`ENV_FILES`] into the process environment.
///
/// Returns the path that was loaded. Variables already set are not overridden.
pub fn load_env_files() -> Option<&'static str> {
    for path in ENV_FILES {
        if Path::new(path).is_file() && dotenvy::from_path(path).is_ok() {
            debug!(path = path, "loaded environment file");
            return Some(path);
        }
    }
    None
}

/// Per-call overrides for one `run_parallel` batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Label attached to logs for this batch.
    pub api_name: String,
    /// Overrides `max_workers`.
    pub max_workers: Option<usize>,
    /// Overrides `max_retries`.
    pub max_retries: Option<u32>,
    /// Overrides the per-task budget.
    pub task_timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            api_name: "default".into(),
            max_workers: None,
            max_retries: None,
            task_timeout: None,
        }
    }
}

impl RunOptions {
    /// Options with the given API label and no overrides.
    #[must_use]
    pub fn new(api_name: impl Into<String>) -> Self {
        Self {
            api_name: api_name.into(),
            ..Self::default()
        }
    }

    /// Override the worker count.
    #[must_use]
    pub const fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    /// Override the attempts per task.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Override the per-task budget.
    #[must_use]
    pub const fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }
}
