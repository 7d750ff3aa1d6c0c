//! Collaborator traits consumed by the grading engine.
//!
//! The sandbox traits are implemented by `skillforge-sandbox`, the
//! analyzer by `skillforge-analysis`. Repository, store, and analytics
//! contracts belong to the surrounding platform; in-memory versions
//! live in [`crate::memory`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GradeError;
use crate::model::{Exercise, TestCase};
use crate::results::{AnalysisReport, ExecutionOutcome, MetricsBundle, ProgressRecord};

// ---------------------------------------------------------------------------
// Sandbox execution
// ---------------------------------------------------------------------------

/// Capability set injected into the isolated execution unit. Candidate
/// code sees nothing of the host beyond what this describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionProfile {
    /// Function the sandbox invokes per test case.
    pub entry_point: String,
    /// Expose the restricted network stub to the submission.
    pub allow_network: bool,
}

impl ExecutionProfile {
    pub fn for_exercise(exercise: &Exercise) -> Self {
        Self {
            entry_point: exercise.entry_point.clone(),
            allow_network: exercise.allow_network,
        }
    }
}

/// Result of loading a submission into a fresh sandbox.
pub enum SessionStart {
    /// The source loaded; the session is ready for invocations.
    Ready(Box<dyn SandboxSession>),
    /// The source could not be loaded or evaluated at all.
    SyntaxFailure(String),
}

/// Factory for isolated execution units.
///
/// Implementations must guarantee that candidate code cannot observe
/// or mutate caller state; communication is message-passing only.
#[async_trait]
pub trait SandboxExecutor: Send + Sync {
    /// Implementation name, for diagnostics.
    fn name(&self) -> &str;

    /// Load a submission into a new isolated unit.
    ///
    /// `Err` means a host-side fault (the isolation unit could not be
    /// brought up at all); submission faults come back as
    /// [`SessionStart::SyntaxFailure`] or through the session.
    async fn start(&self, source: &str, profile: &ExecutionProfile)
        -> anyhow::Result<SessionStart>;
}

/// One live isolated unit, reusable across sequential invocations.
#[async_trait]
pub trait SandboxSession: Send {
    /// Invoke the entry point with the given input.
    ///
    /// Never blocks the caller beyond `timeout`; on expiry the unit is
    /// forcibly terminated and [`ExecutionOutcome::TimedOut`] returned.
    async fn invoke(&mut self, args: &Value, timeout: Duration) -> ExecutionOutcome;

    /// Forcibly stop the unit. Idempotent.
    async fn terminate(&mut self);
}

// ---------------------------------------------------------------------------
// Static analysis
// ---------------------------------------------------------------------------

/// Pure text analyzer. Must be deterministic, must never require the
/// text to be syntactically valid, and runs on the requester's thread.
pub trait StaticAnalyzer: Send + Sync {
    fn analyze(&self, source: &str) -> AnalysisReport;
}

// ---------------------------------------------------------------------------
// Platform collaborators
// ---------------------------------------------------------------------------

/// Read-only catalog of exercises, grouped into ordered categories.
#[async_trait]
pub trait ExerciseRepository: Send + Sync {
    /// Fails with [`GradeError::RepositoryNotFound`] for unknown ids.
    async fn get_exercise(&self, id: &str) -> Result<Exercise, GradeError>;

    /// Supplementary cases appended for highest-tier learners, graded
    /// identically to authored cases, in the order returned.
    async fn advanced_test_cases(&self, exercise_id: &str) -> Result<Vec<TestCase>, GradeError>;

    /// Next exercise after `exercise_id` within its category, in
    /// declared order.
    async fn next_in_category(&self, exercise_id: &str) -> Result<Option<String>, GradeError>;

    /// First exercise of the category following `exercise_id`'s, in
    /// declared category order.
    async fn first_in_next_category(&self, exercise_id: &str)
        -> Result<Option<String>, GradeError>;
}

/// What the store knows about a user's history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressSummary {
    /// Exercise ids the user has completed.
    pub completed: Vec<String>,
    /// Exercises attempted but not completed.
    pub in_progress: Vec<InProgressEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InProgressEntry {
    pub id: String,
    /// Best accuracy reached so far, in [0, 1].
    pub accuracy: f64,
}

/// Durable progress persistence. Write failures surface as
/// [`GradeError::Persistence`]; retry policy is the caller's concern.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn save_progress(
        &self,
        user_id: &str,
        exercise_id: &str,
        record: &ProgressRecord,
    ) -> Result<(), GradeError>;

    async fn get_progress(&self, user_id: &str) -> Result<ProgressSummary, GradeError>;
}

/// Learning-analytics collaborator. Best-effort from the engine's
/// perspective: failures are logged, never surfaced to the caller.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn update_metrics(
        &self,
        user_id: &str,
        exercise_id: &str,
        metrics: &MetricsBundle,
    ) -> anyhow::Result<()>;
}
