//! Result types produced by a grading run.
//!
//! [`ProgressRecord::build`] is the score aggregator: it merges the
//! harness results and the analysis report into the metrics bundle
//! that gets persisted and fed to learning analytics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Submission;

/// Outcome of one sandboxed invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The entry point returned a value.
    Value(Value),
    /// The source could not be loaded or evaluated at all. Applies
    /// uniformly to every pending test case in the run.
    SyntaxFailure(String),
    /// The invocation threw. Scoped to this invocation only.
    RuntimeFailure {
        message: String,
        #[serde(default)]
        stack: Option<String>,
    },
    /// The wall-clock bound expired and the sandbox was terminated.
    /// Partial output is discarded, never returned.
    TimedOut,
}

/// One test case's graded result. The harness produces exactly one of
/// these per test case, in declared order, on every path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    /// The input the case was (or would have been) invoked with.
    pub input: Value,
    /// Actual output, absent on any kind of failure.
    pub actual: Option<Value>,
    /// Failure description, absent on success.
    pub error: Option<String>,
    pub passed: bool,
    /// Wall-clock execution time. Zero for cases never attempted.
    pub duration_ms: u64,
    /// False for cases synthesized after a syntax failure or a
    /// run-aborting timeout; those never reached the sandbox.
    pub attempted: bool,
}

impl TestResult {
    /// A result for a case that was never handed to the sandbox.
    pub fn not_attempted(input: Value, error: &str) -> Self {
        Self {
            input,
            actual: None,
            error: Some(error.to_string()),
            passed: false,
            duration_ms: 0,
            attempted: false,
        }
    }
}

/// Structural metrics derived from submission text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    /// Total line count.
    pub lines: usize,
    /// Decision-point token occurrences (conditionals, loops, case,
    /// catch, logical and/or, ternary).
    pub branches: usize,
    /// Function and lambda declaration count.
    pub functions: usize,
    /// 1 + branches, per the decision-keyword approximation.
    pub cyclomatic: usize,
    /// Weighted score in [0, 1]; lower raw complexity scores higher.
    pub score: f64,
}

/// One quality sub-check: a sub-score in [0, 1] and its issue list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub score: f64,
    pub issues: Vec<String>,
}

impl QualityCheck {
    pub fn clean() -> Self {
        Self {
            score: 1.0,
            issues: Vec::new(),
        }
    }
}

/// The four quality sub-checks and their mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub formatting: QualityCheck,
    pub naming: QualityCheck,
    pub commenting: QualityCheck,
    pub duplication: QualityCheck,
    /// Arithmetic mean of the four sub-scores.
    pub score: f64,
}

/// Static-analysis output. A pure function of submission text; never
/// depends on execution outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub complexity: ComplexityMetrics,
    pub quality: QualityReport,
}

/// The metrics bundle emitted to learning analytics and persisted on
/// the progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsBundle {
    /// Passed / total test cases, in [0, 1]. Zero when there are no cases.
    pub accuracy: f64,
    /// Mean execution duration in milliseconds over attempted cases.
    /// Zero when nothing was attempted (e.g. syntax failure).
    pub performance: f64,
    /// Complexity score from the analyzer, in [0, 1].
    pub complexity: f64,
    /// Quality score from the analyzer, in [0, 1].
    pub quality: f64,
}

/// The persisted outcome of one grading run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub exercise_id: String,
    pub user_id: String,
    pub results: Vec<TestResult>,
    pub analysis: AnalysisReport,
    pub timestamp: DateTime<Utc>,
    /// Holds exactly when accuracy is 1.0.
    pub completed: bool,
    pub metrics: MetricsBundle,
}

impl ProgressRecord {
    /// Aggregate harness results and the analysis report into a record.
    pub fn build(
        submission: &Submission,
        results: Vec<TestResult>,
        analysis: AnalysisReport,
    ) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let accuracy = if total == 0 {
            0.0
        } else {
            clamp_unit(passed as f64 / total as f64)
        };

        let attempted: Vec<&TestResult> = results.iter().filter(|r| r.attempted).collect();
        let performance = if attempted.is_empty() {
            0.0
        } else {
            attempted.iter().map(|r| r.duration_ms as f64).sum::<f64>() / attempted.len() as f64
        };

        let metrics = MetricsBundle {
            accuracy,
            performance,
            complexity: clamp_unit(analysis.complexity.score),
            quality: clamp_unit(analysis.quality.score),
        };

        Self {
            exercise_id: submission.exercise_id.clone(),
            user_id: submission.user_id.clone(),
            results,
            analysis,
            timestamp: Utc::now(),
            completed: accuracy == 1.0,
            metrics,
        }
    }
}

/// Clamp a score into [0, 1]. NaN collapses to 0.
pub fn clamp_unit(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
