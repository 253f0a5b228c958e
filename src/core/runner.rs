//! Per-task retry loop shared by the async executor and the blocking pool.
//!
//! Every attempt goes through the same steps: take a rate-limit permit, sleep
//! for a random jitter, invoke the operation. A failed attempt sleeps for the
//! backoff delay and tries again until `max_retries` attempts were made. The
//! whole loop runs under the task's wall-clock budget.

use std::sync::atomic::AtomicU32;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, warn};

use super::backoff::{BackoffPolicy, Jitter};
use super::metrics::{
    MetricsSink, TASKS_DURATION_MS, TASKS_FAILURE, TASKS_RETRIES, TASKS_SUCCESS, TASKS_TIMEOUT,
};
use super::outcome::{Outcome, TaskFailure, TaskTimeout};
use super::task::{ExecutionContext, Task};
use super::{AppResult, ExecutorError, RateLimiter};
use crate::config::{ExecutorConfig, RunOptions};

/// Effective settings for one batch: config merged with run options.
#[derive(Debug, Clone)]
pub(crate) struct ExecutionPlan {
    pub api_name: String,
    pub max_workers: usize,
    pub max_retries: u32,
    pub task_timeout: Duration,
    pub backoff: BackoffPolicy,
    pub jitter: Jitter,
}

impl ExecutionPlan {
    /// Merge and validate. Fails before any task is touched.
    pub fn resolve(config: &ExecutorConfig, options: RunOptions) -> Result<Self, ExecutorError> {
        let plan = Self {
            api_name: options.api_name,
            max_workers: options.max_workers.unwrap_or(config.max_workers),
            max_retries: options.max_retries.unwrap_or(config.max_retries),
            task_timeout: options.task_timeout.unwrap_or_else(|| config.task_timeout()),
            backoff: BackoffPolicy::new(config.initial_backoff(), config.max_backoff()),
            jitter: Jitter::new(config.jitter_min(), config.jitter_max()),
        };
        if plan.max_workers == 0 {
            return Err(ExecutorError::InvalidArgument(
                "max_workers must be greater than 0".into(),
            ));
        }
        if plan.max_retries == 0 {
            return Err(ExecutorError::InvalidArgument(
                "max_retries must be greater than 0".into(),
            ));
        }
        if plan.task_timeout.is_zero() {
            return Err(ExecutorError::InvalidArgument(
                "task_timeout must be greater than 0".into(),
            ));
        }
        Ok(plan)
    }

    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.task_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Reject malformed tasks before dispatch.
pub(crate) fn validate_tasks<T>(tasks: &[Task<T>]) -> Result<(), ExecutorError> {
    for (index, task) in tasks.iter().enumerate() {
        if task.name().trim().is_empty() {
            return Err(ExecutorError::InvalidArgument(format!(
                "task #{index} has an empty name"
            )));
        }
    }
    Ok(())
}

/// Runs single tasks to a terminal outcome.
#[derive(Clone)]
pub(crate) struct TaskRunner {
    plan: Arc<ExecutionPlan>,
    limiter: Arc<RateLimiter>,
    metrics: Arc<dyn MetricsSink>,
}

impl TaskRunner {
    pub fn new(plan: ExecutionPlan, limiter: Arc<RateLimiter>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            plan: Arc::new(plan),
            limiter,
            metrics,
        }
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    /// Run `task` to completion under its budget.
    ///
    /// `attempts` is shared with whoever may need to report the attempt count
    /// after abandoning the task. Metrics are NOT recorded here; the caller
    /// that publishes the outcome calls [`TaskRunner::record`] with the
    /// returned [`TaskRecord`].
    pub async fn run<T: Send + 'static>(
        &self,
        index: usize,
        worker: usize,
        mut task: Task<T>,
        attempts: Arc<AtomicU32>,
    ) -> (Outcome<T>, TaskRecord) {
        let ctx = ExecutionContext::new(index, worker, attempts);
        let budget = self.plan.task_timeout;
        let result = tokio::time::timeout(budget, self.attempt_loop(&mut task, &ctx)).await;

        let mut record = TaskRecord::for_task(&task, ctx.attempts());
        // A result that lands after the deadline is still a timeout.
        if ctx.elapsed() > budget {
            let timeout = self.timeout_for(index, &record.name, &record.args, record.attempts);
            return (Outcome::Timeout(timeout), record);
        }
        let outcome = match result {
            Ok(Ok(value)) => {
                record.result = task.summarize(&value);
                Outcome::Success(value)
            }
            Ok(Err(err)) => Outcome::Failure(TaskFailure {
                index,
                name: record.name.clone(),
                args: record.args.clone(),
                attempts: record.attempts,
                message: format!("{err:#}"),
            }),
            Err(_) => Outcome::Timeout(self.timeout_for(
                index,
                &record.name,
                &record.args,
                record.attempts,
            )),
        };
        (outcome, record)
    }

    async fn attempt_loop<T: Send + 'static>(
        &self,
        task: &mut Task<T>,
        ctx: &ExecutionContext,
    ) -> AppResult<T> {
        loop {
            self.limiter.acquire().await;
            let jitter = self.plan.jitter.sample();
            if !jitter.is_zero() {
                tokio::time::sleep(jitter).await;
            }

            let attempt = ctx.begin_attempt();
            match task.invoke().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= self.plan.max_retries => return Err(err),
                Err(err) => {
                    let delay = self.plan.backoff.delay(attempt)?;
                    warn!(
                        api = %self.plan.api_name,
                        function = task.name(),
                        index = ctx.index,
                        worker = ctx.worker,
                        attempt = attempt,
                        max_retries = self.plan.max_retries,
                        delay_ms = %delay.as_millis(),
                        error = %format!("{err:#}"),
                        "attempt failed, retrying after backoff"
                    );
                    self.metrics.increment(TASKS_RETRIES, 1);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Build the timeout record for a task that missed its deadline.
    pub fn timeout_for(&self, index: usize, name: &str, args: &Value, attempts: u32) -> TaskTimeout {
        TaskTimeout {
            index,
            name: name.to_owned(),
            args: args.clone(),
            attempts,
            timeout_ms: self.plan.timeout_ms(),
        }
    }

    /// Publish counters, timing and the task summary log for a final outcome.
    pub fn record<T>(&self, outcome: &Outcome<T>, record: &TaskRecord, elapsed: Duration) {
        #[allow(clippy::cast_precision_loss)]
        let duration_ms = elapsed.as_millis() as f64;
        self.metrics.observe(TASKS_DURATION_MS, duration_ms);
        let api = self.plan.api_name.as_str();
        match outcome {
            Outcome::Success(_) => {
                self.metrics.increment(TASKS_SUCCESS, 1);
                match &record.result {
                    Some(result) => debug!(
                        api = api,
                        function = %record.name,
                        params = %record.args,
                        status = "success",
                        attempts = record.attempts,
                        duration_ms = duration_ms,
                        result = %result,
                        "task summary"
                    ),
                    None => debug!(
                        api = api,
                        function = %record.name,
                        params = %record.args,
                        status = "success",
                        attempts = record.attempts,
                        duration_ms = duration_ms,
                        "task summary"
                    ),
                }
            }
            Outcome::Failure(failure) => {
                self.metrics.increment(TASKS_FAILURE, 1);
                error!(
                    api = api,
                    function = %record.name,
                    params = %record.args,
                    status = "failed",
                    attempts = failure.attempts,
                    duration_ms = duration_ms,
                    error = %failure.message,
                    "task summary"
                );
            }
            Outcome::Timeout(timeout) => {
                self.metrics.increment(TASKS_TIMEOUT, 1);
                warn!(
                    api = api,
                    function = %record.name,
                    params = %record.args,
                    status = "timeout",
                    attempts = timeout.attempts,
                    duration_ms = duration_ms,
                    "task summary"
                );
            }
        }
    }
}

/// What the task summary log says about one task.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TaskRecord {
    pub name: String,
    pub args: Value,
    pub attempts: u32,
    /// Result summary, present only for successes that opted in.
    pub result: Option<Value>,
}

impl TaskRecord {
    pub fn for_task<T>(task: &Task<T>, attempts: u32) -> Self {
        Self::new(task.name(), task.args(), attempts)
    }

    pub fn new(name: &str, args: &Value, attempts: u32) -> Self {
        Self {
            name: name.to_owned(),
            args: args.clone(),
            attempts,
            result: None,
        }
    }
}
