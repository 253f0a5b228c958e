//! Core execution pipeline: tasks, retry policy, rate limiting and the executor.

pub mod backoff;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod outcome;
pub mod rate_limiter;
pub mod task;

mod runner;
mod worker_pool;

pub use backoff::{BackoffPolicy, Jitter};
pub use error::{AppResult, CacheError, ExecutorError, TaskError};
pub use executor::Executor;
pub use metrics::{
    InMemoryMetrics, MetricsSink, MetricsSnapshot, NoopMetrics, TimingSummary, TASKS_DURATION_MS,
    TASKS_FAILURE, TASKS_RETRIES, TASKS_SUCCESS, TASKS_TIMEOUT,
};
pub use outcome::{BatchSummary, Outcome, ReportStatus, TaskFailure, TaskReport, TaskTimeout};
pub use rate_limiter::{RateLimiter, RateWindow};
pub use task::{Operation, OperationFuture, Task};
