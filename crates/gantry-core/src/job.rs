//! Job descriptors and results.

use serde::{Deserialize, Serialize};

/// A fully resolved, ready-to-execute invocation.
///
/// Created by the invocation builder, immutable once created, consumed
/// exactly once by the process supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    /// Report label; padded by the builder so report columns align.
    pub label: String,

    /// Argument vector (first element is the executable).
    pub argv: Vec<String>,
}

impl JobDescriptor {
    pub fn new(label: impl Into<String>, argv: Vec<String>) -> Self {
        Self {
            label: label.into(),
            argv,
        }
    }
}

/// Outcome of one terminated job process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    /// Label copied from the descriptor.
    pub label: String,

    /// Exit code (0 = success; -1 when terminated by signal).
    pub exit_code: i32,

    /// Combined stdout+stderr, empty for a single pass-through job.
    pub combined_output: Vec<u8>,
}

impl JobResult {
    /// Whether this job passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Results of one batch, in submission order, plus the aggregate exit code.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Per-job results, submission order.
    pub results: Vec<JobResult>,

    /// 0 if every job exited 0; otherwise the exit code of the first
    /// failing job. Which failing code surfaces when several jobs fail
    /// with different codes is unspecified; callers branch on zero only.
    pub exit_code: i32,
}

impl BatchReport {
    /// Derive the aggregate exit code from a result list.
    pub fn from_results(results: Vec<JobResult>) -> Self {
        let exit_code = results
            .iter()
            .find(|r| !r.passed())
            .map(|r| r.exit_code)
            .unwrap_or(0);
        Self { results, exit_code }
    }

    /// Whether every job in the batch passed.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Number of jobs that passed.
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Number of jobs that failed.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, exit_code: i32) -> JobResult {
        JobResult {
            label: label.to_string(),
            exit_code,
            combined_output: Vec::new(),
        }
    }

    #[test]
    fn test_all_passing_aggregate_is_zero() {
        let report = BatchReport::from_results(vec![result("a", 0), result("b", 0)]);
        assert!(report.success());
        assert_eq!(report.exit_code, 0);
        assert_eq!(report.passed_count(), 2);
        assert_eq!(report.failed_count(), 0);
    }

    #[test]
    fn test_single_failure_surfaces_its_code() {
        let report =
            BatchReport::from_results(vec![result("a", 0), result("b", 7), result("c", 0)]);
        assert!(!report.success());
        assert_eq!(report.exit_code, 7);
        assert_eq!(report.failed_count(), 1);
    }

    #[test]
    fn test_multiple_failures_surface_first_in_order() {
        let report = BatchReport::from_results(vec![result("a", 3), result("b", 5)]);
        assert_eq!(report.exit_code, 3);
        assert_eq!(report.failed_count(), 2);
    }

    #[test]
    fn test_empty_batch_is_success() {
        let report = BatchReport::from_results(Vec::new());
        assert!(report.success());
    }
}
