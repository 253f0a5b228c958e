//! Permit gate shared by every attempt of every task.
//!
//! Two window strategies are supported:
//!
//! - [`RateWindow::Fixed`]: a counter of permits issued since the window
//!   started. When `rate_interval` has elapsed the counter and window start
//!   are reset together. Cheap, but two adjacent windows may grant up to
//!   `2 * rate_limit` permits inside one interval-long span.
//! - [`RateWindow::Sliding`]: the grant times of the last `rate_limit`
//!   permits. A permit is granted only when fewer than `rate_limit` grants
//!   fall inside the trailing interval, so no interval-long span ever holds
//!   more than `rate_limit` grants.
//!
//! All state lives behind one `parking_lot::Mutex`. The lock is only held for
//! the check-and-update and never across a sleep.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Window strategy for the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateWindow {
    /// Fixed window counter, reset when the interval elapses.
    #[default]
    Fixed,
    /// Sliding log of recent grants.
    Sliding,
}

enum WindowState {
    Fixed { window_start: Instant, issued: u32 },
    Sliding { grants: VecDeque<Instant> },
}

/// Rate limiter granting at most `limit` permits per `interval`.
pub struct RateLimiter {
    limit: u32,
    interval: Duration,
    state: Mutex<WindowState>,
}

impl RateLimiter {
    /// Create a limiter. A `limit` of 0 or a zero `interval` disables limiting.
    #[must_use]
    pub fn new(limit: u32, interval: Duration, window: RateWindow) -> Self {
        let state = match window {
            RateWindow::Fixed => WindowState::Fixed {
                window_start: Instant::now(),
                issued: 0,
            },
            RateWindow::Sliding => WindowState::Sliding {
                grants: VecDeque::with_capacity(limit.min(1024) as usize),
            },
        };
        Self {
            limit,
            interval,
            state: Mutex::new(state),
        }
    }

    /// A limiter that never blocks.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(0, Duration::ZERO, RateWindow::Fixed)
    }

    /// Whether this limiter actually gates callers.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.limit > 0 && !self.interval.is_zero()
    }

    /// Permits per interval.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Length of the rate window.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Try to take a permit now.
    ///
    /// # Errors
    ///
    /// Returns the time to wait before a permit may become available.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }

    /// Try to take a permit at the given instant.
    ///
    /// # Errors
    ///
    /// Returns the time to wait before a permit may become available.
    pub fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        if !self.is_enabled() {
            return Ok(());
        }
        let mut state = self.state.lock();
        match &mut *state {
            WindowState::Fixed {
                window_start,
                issued,
            } => {
                let elapsed = now.saturating_duration_since(*window_start);
                if elapsed >= self.interval {
                    *window_start = now;
                    *issued = 0;
                }
                if *issued < self.limit {
                    *issued += 1;
                    return Ok(());
                }
                let elapsed = now.saturating_duration_since(*window_start);
                Err(self.interval.saturating_sub(elapsed))
            }
            WindowState::Sliding { grants } => {
                while let Some(oldest) = grants.front() {
                    if now.saturating_duration_since(*oldest) >= self.interval {
                        grants.pop_front();
                    } else {
                        break;
                    }
                }
                if grants.len() < self.limit as usize {
                    grants.push_back(now);
                    return Ok(());
                }
                let oldest = grants.front().copied().unwrap_or(now);
                Err(self
                    .interval
                    .saturating_sub(now.saturating_duration_since(oldest)))
            }
        }
    }

    /// Wait until a permit is granted. No-op when limiting is disabled.
    pub async fn acquire(&self) {
        loop {
            match self.try_acquire() {
                Ok(()) => return,
                Err(wait) => {
                    trace!(wait_ms = %wait.as_millis(), "rate limit window exhausted, waiting");
                    // A zero wait can only come from a window that expired on this very tick.
                    tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
                }
            }
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
