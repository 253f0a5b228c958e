//! # Fanout Executor
//!
//! Bounded-concurrency batch execution for calls against rate-limited
//! upstream APIs.
//!
//! A request handler typically needs to run the same operation for many
//! accounts or entities (fetch campaigns for every customer, update dozens of
//! budgets) against an API that throttles, fails transiently and sometimes
//! hangs. The [`Executor`](core::Executor) runs such a batch with:
//!
//! - **Bounded parallelism**: at most `max_workers` operations in flight
//! - **Retry with backoff**: exponential, capped, up to `max_retries` attempts
//! - **Jitter**: a random pause before every attempt to spread bursts
//! - **Per-task timeout**: one wall-clock budget covering all attempts
//! - **Rate limiting**: a permit gate shared by every attempt of every task
//! - **Metrics**: success/failure/timeout/retry counters and task durations
//!
//! Every submitted task yields exactly one [`Outcome`](core::Outcome), in
//! submission order. A failing or hanging task never fails the batch.
//!
//! ## Async batches
//!
//! ```rust,ignore
//! use fanout_executor::builders::ExecutorBuilder;
//! use fanout_executor::config::{ExecutorConfig, RunOptions};
//! use fanout_executor::core::{BatchSummary, InMemoryMetrics, Task};
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(InMemoryMetrics::new());
//! let executor = ExecutorBuilder::from_config(ExecutorConfig::from_env()?)
//!     .with_metrics(metrics.clone())
//!     .build()?;
//!
//! let tasks = budgets
//!     .into_iter()
//!     .map(|(customer_id, budget)| Task::new("update_budget", (customer_id, budget), update_budget));
//! let outcomes = executor
//!     .run_parallel_with(tasks, RunOptions::new("google_ads").with_max_workers(4))
//!     .await?;
//!
//! let summary = BatchSummary::from_outcomes(&outcomes);
//! if !summary.all_succeeded() {
//!     tracing::warn!(failed = summary.failed, timed_out = summary.timed_out, "partial batch");
//! }
//! ```
//!
//! ## Blocking batches
//!
//! Synchronous callers use `run_parallel_blocking`, which runs the same
//! pipeline on dedicated OS threads, each with its own single-threaded
//! runtime:
//!
//! ```rust,ignore
//! let outcomes = executor.run_parallel_blocking(tasks)?;
//! ```
//!
//! ## Shared rate limits
//!
//! One [`RateLimiter`](core::RateLimiter) can back several executors so that
//! all batches against the same upstream draw from one permit budget:
//!
//! ```rust,ignore
//! let limiter = Arc::new(RateLimiter::new(5, Duration::from_secs(1), RateWindow::Sliding));
//! let reads = ExecutorBuilder::new().with_rate_limiter(limiter.clone()).build()?;
//! let writes = ExecutorBuilder::new().with_rate_limiter(limiter).build()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core execution pipeline: tasks, retries, rate limiting, executor.
pub mod core;
/// Configuration models for the executor and per-call options.
pub mod config;
/// Builders to construct executors from configuration.
pub mod builders;
/// Infrastructure adapters for cache backends.
pub mod infra;
/// Response shaping for API handlers.
pub mod runtime;
/// Shared utilities.
pub mod util;
