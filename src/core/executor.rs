//! Bounded-concurrency batch executor.
//!
//! [`Executor::run_parallel`] fans a batch of tasks out over a fixed number of
//! workers and gathers exactly one [`Outcome`] per task, in submission order.
//! Individual task failures and timeouts are data in the result, never an
//! error of the call; only invalid configuration fails the batch, and it does
//! so before any operation is invoked.
//!
//! # Example
//!
//! ```rust,ignore
//! use fanout_executor::config::{ExecutorConfig, RunOptions};
//! use fanout_executor::core::{Executor, Task};
//!
//! let executor = Executor::new(ExecutorConfig::new().with_max_workers(4))?;
//! let tasks = customer_ids
//!     .into_iter()
//!     .map(|id| Task::new("fetch_campaigns", id, fetch_campaigns));
//! let outcomes = executor
//!     .run_parallel_with(tasks, RunOptions::new("google_ads"))
//!     .await?;
//! let summary = BatchSummary::from_outcomes(&outcomes);
//! ```
//!
//! # Cancellation
//!
//! A task that exceeds its budget is reported as `Timeout` and its attempt
//! future is dropped at the next suspension point. Work that never yields
//! (blocking calls, including [`Task::blocking`] operations already handed to
//! the blocking thread pool) cannot be interrupted: it runs to completion in
//! the background and its result is discarded.

use std::collections::VecDeque;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info_span, Instrument};
use uuid::Uuid;

use super::metrics::{MetricsSink, NoopMetrics};
use super::outcome::{Outcome, TaskFailure};
use super::runner::{validate_tasks, ExecutionPlan, TaskRecord, TaskRunner};
use super::{ExecutorError, RateLimiter, Task};
use crate::config::{ExecutorConfig, RunOptions};

/// Runs batches of tasks with bounded parallelism, retries and timeouts.
///
/// The executor keeps no state between calls apart from the rate limiter it
/// shares with every batch (and with other executors it was built with).
pub struct Executor {
    config: ExecutorConfig,
    limiter: Arc<RateLimiter>,
    metrics: Arc<dyn MetricsSink>,
}

impl Executor {
    /// Create an executor with its own rate limiter and no metrics.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::InvalidArgument` if the configuration is invalid.
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        config.validate().map_err(ExecutorError::InvalidArgument)?;
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit,
            config.rate_interval(),
            config.rate_window,
        ));
        Ok(Self::from_parts(config, limiter, Arc::new(NoopMetrics)))
    }

    /// Assemble an executor from already validated parts.
    pub(crate) fn from_parts(
        config: ExecutorConfig,
        limiter: Arc<RateLimiter>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            limiter,
            metrics,
        }
    }

    /// Configuration this executor was built with.
    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Rate limiter shared by all batches of this executor.
    #[must_use]
    pub const fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Run a batch with the configured defaults.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::InvalidArgument` before dispatch if a task is malformed.
    pub async fn run_parallel<T, I>(&self, tasks: I) -> Result<Vec<Outcome<T>>, ExecutorError>
    where
        T: Send + 'static,
        I: IntoIterator<Item = Task<T>>,
    {
        self.run_parallel_with(tasks, RunOptions::default()).await
    }

    /// Run a batch with per-call overrides.
    ///
    /// The result has one outcome per task, index-aligned with `tasks`. An
    /// empty batch returns immediately without starting any worker.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::InvalidArgument` before dispatch if an override
    /// is out of range or a task is malformed.
    pub async fn run_parallel_with<T, I>(
        &self,
        tasks: I,
        options: RunOptions,
    ) -> Result<Vec<Outcome<T>>, ExecutorError>
    where
        T: Send + 'static,
        I: IntoIterator<Item = Task<T>>,
    {
        let runner = self.runner(options)?;
        let tasks: Vec<Task<T>> = tasks.into_iter().collect();
        validate_tasks(&tasks)?;
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let worker_count = runner.plan().max_workers.min(tasks.len());
        let span = info_span!(
            "run_parallel",
            api = %runner.plan().api_name,
            batch_id = %Uuid::new_v4(),
            tasks = tasks.len(),
            workers = worker_count,
        );
        Ok(gather(runner, tasks, worker_count).instrument(span).await)
    }

    /// Run a batch on dedicated OS threads, blocking the caller.
    ///
    /// Intended for synchronous callers. Do not call it from inside an async
    /// runtime worker; use [`Executor::run_parallel`] there.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::InvalidArgument` for malformed input and
    /// `ExecutorError::Internal` if worker threads cannot be started.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn run_parallel_blocking<T, I>(&self, tasks: I) -> Result<Vec<Outcome<T>>, ExecutorError>
    where
        T: Send + 'static,
        I: IntoIterator<Item = Task<T>>,
    {
        self.run_parallel_blocking_with(tasks, RunOptions::default())
    }

    /// Blocking variant of [`Executor::run_parallel_with`].
    ///
    /// # Errors
    ///
    /// Same as [`Executor::run_parallel_blocking`].
    #[cfg(not(target_arch = "wasm32"))]
    pub fn run_parallel_blocking_with<T, I>(
        &self,
        tasks: I,
        options: RunOptions,
    ) -> Result<Vec<Outcome<T>>, ExecutorError>
    where
        T: Send + 'static,
        I: IntoIterator<Item = Task<T>>,
    {
        let runner = self.runner(options)?;
        let tasks: Vec<Task<T>> = tasks.into_iter().collect();
        validate_tasks(&tasks)?;
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let span = info_span!(
            "run_parallel_blocking",
            api = %runner.plan().api_name,
            batch_id = %Uuid::new_v4(),
            tasks = tasks.len(),
        );
        let _entered = span.enter();
        super::worker_pool::run_blocking(runner, tasks)
    }

    fn runner(&self, options: RunOptions) -> Result<TaskRunner, ExecutorError> {
        let plan = ExecutionPlan::resolve(&self.config, options)?;
        Ok(TaskRunner::new(
            plan,
            Arc::clone(&self.limiter),
            Arc::clone(&self.metrics),
        ))
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

/// Fan `tasks` out over `worker_count` async workers sharing one FIFO queue.
async fn gather<T: Send + 'static>(
    runner: TaskRunner,
    tasks: Vec<Task<T>>,
    worker_count: usize,
) -> Vec<Outcome<T>> {
    let total = tasks.len();
    let identities: Vec<(String, Value)> = tasks
        .iter()
        .map(|task| (task.name().to_owned(), task.args().clone()))
        .collect();
    let queue = Arc::new(Mutex::new(
        tasks.into_iter().enumerate().collect::<VecDeque<_>>(),
    ));
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Outcome<T>)>();

    let mut workers = JoinSet::new();
    for worker in 0..worker_count {
        let queue = Arc::clone(&queue);
        let tx = tx.clone();
        let runner = runner.clone();
        workers.spawn(
            async move {
                loop {
                    let next = queue.lock().pop_front();
                    let Some((index, task)) = next else {
                        break;
                    };
                    debug!(worker = worker, index = index, function = task.name(), "dispatching task");
                    let started = Instant::now();
                    let (outcome, record) = runner
                        .run(index, worker, task, Arc::new(AtomicU32::new(0)))
                        .await;
                    runner.record(&outcome, &record, started.elapsed());
                    if tx.send((index, outcome)).is_err() {
                        break;
                    }
                }
            }
            .in_current_span(),
        );
    }
    drop(tx);

    let mut slots: Vec<Option<Outcome<T>>> = std::iter::repeat_with(|| None).take(total).collect();
    while let Some((index, outcome)) = rx.recv().await {
        slots[index] = Some(outcome);
    }
    while let Some(joined) = workers.join_next().await {
        if let Err(err) = joined {
            error!(error = %err, "worker terminated abnormally");
        }
    }

    slots
        .into_iter()
        .zip(identities)
        .enumerate()
        .map(|(index, (slot, (name, args)))| {
            slot.unwrap_or_else(|| {
                let record = TaskRecord::new(&name, &args, 0);
                let outcome = Outcome::Failure(TaskFailure {
                    index,
                    name,
                    args,
                    attempts: 0,
                    message: "worker exited before the task produced an outcome".into(),
                });
                runner.record(&outcome, &record, std::time::Duration::ZERO);
                outcome
            })
        })
        .collect()
}
