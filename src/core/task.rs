//! Units of work handed to the executor.
//!
//! A [`Task`] pairs an operation with the arguments it is invoked with. The
//! arguments are cloned for every attempt, so anything the operation needs
//! (clients, tenant context, ids) must be captured here when the task is
//! built rather than read from ambient state inside the worker.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use super::AppResult;
use crate::util::{summarize_args, summarize_result};

/// Boxed future produced by one invocation of a task's operation.
pub type OperationFuture<T> = BoxFuture<'static, AppResult<T>>;

/// An operation that can be invoked repeatedly with owned arguments.
///
/// Implement this for stateful operations (API clients, repositories) that
/// are shared across many tasks of a batch.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use fanout_executor::core::{AppResult, Operation, Task};
///
/// struct FetchBudgets { client: AdsClient }
///
/// #[async_trait]
/// impl Operation<String, Vec<Budget>> for FetchBudgets {
///     fn name(&self) -> &str { "fetch_budgets" }
///     async fn call(&self, customer_id: String) -> AppResult<Vec<Budget>> {
///         self.client.budgets(&customer_id).await
///     }
/// }
///
/// let op = Arc::new(FetchBudgets { client });
/// let tasks = customer_ids.into_iter().map(|id| Task::from_operation(op.clone(), id));
/// ```
#[async_trait]
pub trait Operation<A, T>: Send + Sync + 'static
where
    A: Send + 'static,
    T: Send + 'static,
{
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Run one attempt.
    async fn call(&self, args: A) -> AppResult<T>;
}

/// One unit of work: a named operation bound to its arguments.
pub struct Task<T> {
    name: String,
    args: Value,
    operation: Box<dyn FnMut() -> OperationFuture<T> + Send>,
    result_summary: Option<fn(&T) -> Value>,
}

impl<T> Task<T> {
    /// Operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Log-safe summary of the arguments.
    #[must_use]
    pub const fn args(&self) -> &Value {
        &self.args
    }

    /// Include a summary of the successful result in the task summary log.
    #[must_use]
    pub fn with_result_summary(mut self) -> Self
    where
        T: Serialize,
    {
        self.result_summary = Some(summarize_result::<T>);
        self
    }

    /// Summary of `value` when the task opted in with
    /// [`Task::with_result_summary`].
    pub(crate) fn summarize(&self, value: &T) -> Option<Value> {
        self.result_summary.map(|summarize| summarize(value))
    }
}

impl<T: Send + 'static> Task<T> {
    /// Bind an async operation to its arguments.
    pub fn new<A, F, Fut>(name: impl Into<String>, args: A, operation: F) -> Self
    where
        A: Serialize + Clone + Send + 'static,
        F: Fn(A) -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let summary = summarize_args(&args);
        Self {
            name: name.into(),
            args: summary,
            operation: Box::new(move || operation(args.clone()).boxed()),
            result_summary: None,
        }
    }

    /// Bind a blocking operation to its arguments.
    ///
    /// Each attempt runs on the runtime's blocking thread pool. If the task
    /// times out the attempt cannot be interrupted: it keeps running in the
    /// background and its result is discarded.
    pub fn blocking<A, F>(name: impl Into<String>, args: A, operation: F) -> Self
    where
        A: Serialize + Clone + Send + 'static,
        F: Fn(A) -> AppResult<T> + Send + Sync + 'static,
    {
        let operation = Arc::new(operation);
        Self::new(name, args, move |args: A| {
            let operation = Arc::clone(&operation);
            async move {
                tokio::task::spawn_blocking(move || operation(args))
                    .await
                    .map_err(|e| anyhow!("blocking operation aborted: {e}"))?
            }
        })
    }

    /// Bind a shared [`Operation`] implementation to its arguments.
    pub fn from_operation<A, O>(operation: Arc<O>, args: A) -> Self
    where
        A: Serialize + Clone + Send + 'static,
        O: Operation<A, T>,
    {
        let name = operation.name().to_owned();
        Self::new(name, args, move |args: A| {
            let operation = Arc::clone(&operation);
            async move { operation.call(args).await }
        })
    }

    /// Invoke the operation once. Panics are converted into errors.
    pub(crate) async fn invoke(&mut self) -> AppResult<T> {
        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| (self.operation)())) {
            Ok(future) => future,
            Err(payload) => return Err(panic_error(payload.as_ref())),
        };
        AssertUnwindSafe(future)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_error(payload.as_ref())))
    }
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

fn panic_error(payload: &(dyn Any + Send)) -> anyhow::Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned());
    anyhow!("operation panicked: {message}")
}

/// Transient per-task execution state, alive from dispatch to outcome.
#[derive(Debug)]
pub(crate) struct ExecutionContext {
    pub index: usize,
    pub worker: usize,
    started: Instant,
    attempts: Arc<AtomicU32>,
}

impl ExecutionContext {
    pub fn new(index: usize, worker: usize, attempts: Arc<AtomicU32>) -> Self {
        Self {
            index,
            worker,
            started: Instant::now(),
            attempts,
        }
    }

    /// Record that the operation is about to be invoked again and return the
    /// 1-based attempt number.
    pub fn begin_attempt(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Invocations started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invoke_passes_cloned_args() {
        let mut task = Task::new("double", 21_i64, |n: i64| async move { Ok(n * 2) });
        assert_eq!(task.invoke().await.unwrap(), 42);
        assert_eq!(task.invoke().await.unwrap(), 42);
        assert_eq!(task.name(), "double");
        assert_eq!(task.args(), &serde_json::json!(21));
    }

    #[tokio::test]
    async fn test_invoke_converts_panic_into_error() {
        let mut task: Task<()> = Task::new("boom", 1_u8, |n: u8| async move {
            assert!(n == 0, "exploded");
            Ok(())
        });
        let err = task.invoke().await.unwrap_err();
        assert!(err.to_string().contains("exploded"));
    }

    #[tokio::test]
    async fn test_blocking_operation_runs_off_runtime() {
        let mut task = Task::blocking("sum", vec![1, 2, 3], |v: Vec<i32>| Ok(v.iter().sum::<i32>()));
        assert_eq!(task.invoke().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_from_operation_uses_operation_name() {
        struct Upper;

        #[async_trait]
        impl Operation<String, String> for Upper {
            fn name(&self) -> &str {
                "upper"
            }

            async fn call(&self, args: String) -> AppResult<String> {
                Ok(args.to_uppercase())
            }
        }

        let mut task = Task::from_operation(Arc::new(Upper), "abc".to_string());
        assert_eq!(task.name(), "upper");
        assert_eq!(task.invoke().await.unwrap(), "ABC");
    }

    #[test]
    fn test_result_summary_is_opt_in() {
        let plain = Task::new("ids", (), |()| async { Ok(vec![1, 2, 3, 4]) });
        assert_eq!(plain.summarize(&vec![1, 2, 3, 4]), None);

        let summarized = Task::new("ids", (), |()| async { Ok(vec![1, 2, 3, 4]) }).with_result_summary();
        let summary = summarized.summarize(&vec![1, 2, 3, 4]).unwrap();
        assert_eq!(summary["type"], "list");
        assert_eq!(summary["length"], 4);
    }

    #[test]
    fn test_context_counts_attempts() {
        let ctx = ExecutionContext::new(3, 0, Arc::new(AtomicU32::new(0)));
        assert_eq!(ctx.begin_attempt(), 1);
        assert_eq!(ctx.begin_attempt(), 2);
        assert_eq!(ctx.attempts(), 2);
        assert_eq!(ctx.index, 3);
    }
}
