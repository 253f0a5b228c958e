//! Blocking batch execution on dedicated OS threads.
//!
//! Used by [`Executor::run_parallel_blocking`](crate::core::Executor::run_parallel_blocking)
//! for callers that are not inside an async runtime. Each worker thread owns a
//! single-threaded tokio runtime and pulls tasks from a shared channel, so the
//! per-attempt pipeline (rate limit, jitter, retry, backoff) is the same one
//! the async executor uses.
//!
//! The calling thread waits on a `Condvar` with the earliest outstanding task
//! deadline. A task whose worker is stuck in non-yielding code is reported as
//! `Timeout` by the caller and its worker thread is detached; the late result
//! is discarded when it eventually arrives.

#[cfg(not(target_arch = "wasm32"))]
mod native;

#[cfg(not(target_arch = "wasm32"))]
pub(crate) use native::run_blocking;
