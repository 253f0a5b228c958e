//! Terminal per-task results and their structured reports.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::TaskError;

/// The operation failed on every allowed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("task #{index} `{name}` failed after {attempts} attempt(s): {message}")]
pub struct TaskFailure {
    /// Position of the task in the submitted batch.
    pub index: usize,
    /// Operation name.
    pub name: String,
    /// Summary of the task arguments.
    pub args: Value,
    /// Attempts made, equal to the effective `max_retries`.
    pub attempts: u32,
    /// Final error, including its cause chain.
    pub message: String,
}

/// The task did not reach a terminal result within its budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("task #{index} `{name}` timed out after {timeout_ms}ms ({attempts} attempt(s) started)")]
pub struct TaskTimeout {
    /// Position of the task in the submitted batch.
    pub index: usize,
    /// Operation name.
    pub name: String,
    /// Summary of the task arguments.
    pub args: Value,
    /// Attempts started before the deadline.
    pub attempts: u32,
    /// Budget that was exceeded.
    pub timeout_ms: u64,
}

/// Terminal result of one task. Exactly one exists per submitted task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The operation returned a value.
    Success(T),
    /// Retries were exhausted.
    Failure(TaskFailure),
    /// The wall-clock budget was exceeded.
    Timeout(TaskTimeout),
}

impl<T> Outcome<T> {
    /// Whether the task succeeded.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Whether the task exhausted its retries.
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Whether the task timed out.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Borrow the success value.
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Convert into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the task's `Failure` or `Timeout` as a `TaskError`.
    pub fn into_result(self) -> Result<T, TaskError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(failure) => Err(failure.into()),
            Self::Timeout(timeout) => Err(timeout.into()),
        }
    }

    /// Structured report for a non-successful outcome.
    pub fn report(&self) -> Option<TaskReport> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(TaskReport {
                index: failure.index,
                name: failure.name.clone(),
                args: failure.args.clone(),
                status: ReportStatus::Failed,
                attempts: failure.attempts,
                error: failure.message.clone(),
            }),
            Self::Timeout(timeout) => Some(TaskReport {
                index: timeout.index,
                name: timeout.name.clone(),
                args: timeout.args.clone(),
                status: ReportStatus::Timeout,
                attempts: timeout.attempts,
                error: format!("Timeout after {}", format_budget(timeout.timeout_ms)),
            }),
        }
    }
}

fn format_budget(ms: u64) -> String {
    if ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{ms}ms")
    }
}

/// Kind of a reported problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Retries exhausted.
    Failed,
    /// Budget exceeded.
    Timeout,
}

/// Serializable record describing one failed or timed-out task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    /// Position of the task in the submitted batch.
    pub index: usize,
    /// Operation name.
    pub name: String,
    /// Summary of the task arguments.
    pub args: Value,
    /// Failure kind.
    pub status: ReportStatus,
    /// Attempts made or started.
    pub attempts: u32,
    /// Human-readable error.
    pub error: String,
}

/// Per-batch tally plus the reports of every unsuccessful task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Tasks submitted.
    pub total: usize,
    /// Tasks that succeeded.
    pub succeeded: usize,
    /// Tasks that exhausted retries.
    pub failed: usize,
    /// Tasks that timed out.
    pub timed_out: usize,
    /// Reports in submission order.
    pub failures: Vec<TaskReport>,
}

impl BatchSummary {
    /// Tally a batch of outcomes.
    pub fn from_outcomes<T>(outcomes: &[Outcome<T>]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Success(_) => summary.succeeded += 1,
                Outcome::Failure(_) => summary.failed += 1,
                Outcome::Timeout(_) => summary.timed_out += 1,
            }
            summary.failures.extend(outcome.report());
        }
        summary
    }

    /// True when every task succeeded.
    #[must_use]
    pub const fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn failure(index: usize) -> TaskFailure {
        TaskFailure {
            index,
            name: "update_budget".into(),
            args: json!(["1234567890", "TAAA"]),
            attempts: 3,
            message: "quota exceeded".into(),
        }
    }

    #[test]
    fn test_summary_counts_and_reports() {
        let outcomes = vec![
            Outcome::Success(1),
            Outcome::Failure(failure(1)),
            Outcome::Timeout(TaskTimeout {
                index: 2,
                name: "update_budget".into(),
                args: json!(["999", "TBBB"]),
                attempts: 1,
                timeout_ms: 30_000,
            }),
        ];
        let summary = BatchSummary::from_outcomes(&outcomes);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.timed_out, 1);
        assert!(!summary.all_succeeded());
        assert_eq!(summary.failures.len(), 2);
        assert_eq!(summary.failures[0].status, ReportStatus::Failed);
        assert_eq!(summary.failures[1].error, "Timeout after 30s");
    }

    #[test]
    fn test_report_serializes_snake_case() {
        let report = Outcome::<()>::Failure(failure(4)).report().unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["index"], 4);
        assert_eq!(json["args"][1], "TAAA");
    }

    #[test]
    fn test_into_result() {
        assert_eq!(Outcome::Success(5).into_result().unwrap(), 5);
        let err = Outcome::<i32>::Failure(failure(0)).into_result().unwrap_err();
        assert!(matches!(err, TaskError::Failure(_)));
        assert!(err.to_string().contains("failed after 3 attempt(s)"));
    }

    #[test]
    fn test_timeout_budget_formatting() {
        assert_eq!(format_budget(1500), "1500ms");
        assert_eq!(format_budget(60_000), "60s");
    }
}
