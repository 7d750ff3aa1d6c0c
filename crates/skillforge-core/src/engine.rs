//! Central grading engine orchestrator.
//!
//! Drives one submission through the full pipeline: repository lookup,
//! sandboxed test execution, static analysis, score aggregation,
//! persistence, analytics, and recommendation. At most one run per
//! user may be active; a concurrent second request is rejected with
//! [`GradeError::UserBusy`], never queued.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use crate::error::GradeError;
use crate::harness::{extend_cases, run_cases, ShortCircuit};
use crate::model::{ProficiencyTier, Submission};
use crate::recommend::next_exercise;
use crate::results::ProgressRecord;
use crate::state::{RunState, RunTracker};
use crate::traits::{
    AnalyticsSink, ExecutionProfile, ExerciseRepository, ProgressStore, SandboxExecutor,
    StaticAnalyzer,
};

/// Configuration for the grading engine.
#[derive(Debug, Clone)]
pub struct GradingConfig {
    /// Hard wall-clock bound per sandbox invocation.
    pub case_timeout: Duration,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            case_timeout: Duration::from_millis(5000),
        }
    }
}

/// One grading request.
#[derive(Debug, Clone)]
pub struct GradeRequest {
    pub submission: Submission,
    /// The submitter's recorded proficiency tier.
    pub tier: ProficiencyTier,
}

/// What one grading run produced.
#[derive(Debug)]
pub struct GradeOutcome {
    pub run_id: Uuid,
    /// Always present once the pipeline reaches scoring, even when
    /// persistence failed afterwards.
    pub record: ProgressRecord,
    /// Next exercise id, only when the run completed the exercise.
    pub recommendation: Option<String>,
    /// Degraded success: scoring succeeded, durability did not.
    pub persistence_error: Option<GradeError>,
    /// Terminal state before the run returned to idle.
    pub final_state: RunState,
}

/// The grading engine.
pub struct GradingEngine {
    repository: Arc<dyn ExerciseRepository>,
    store: Arc<dyn ProgressStore>,
    analytics: Arc<dyn AnalyticsSink>,
    analyzer: Arc<dyn StaticAnalyzer>,
    sandbox: Arc<dyn SandboxExecutor>,
    config: GradingConfig,
    active_users: Mutex<HashSet<String>>,
}

impl GradingEngine {
    pub fn new(
        repository: Arc<dyn ExerciseRepository>,
        store: Arc<dyn ProgressStore>,
        analytics: Arc<dyn AnalyticsSink>,
        analyzer: Arc<dyn StaticAnalyzer>,
        sandbox: Arc<dyn SandboxExecutor>,
        config: GradingConfig,
    ) -> Self {
        Self {
            repository,
            store,
            analytics,
            analyzer,
            sandbox,
            config,
            active_users: Mutex::new(HashSet::new()),
        }
    }

    /// Grade one submission end to end.
    ///
    /// Sandbox syntax errors and timeouts never abort the pipeline: a
    /// score is always produced. Unknown exercise ids abort before
    /// execution begins. A persistence failure is carried in the
    /// outcome alongside the otherwise-complete record.
    pub async fn grade(&self, request: GradeRequest) -> Result<GradeOutcome, GradeError> {
        let GradeRequest { submission, tier } = request;
        let user_id = submission.user_id.clone();

        let _slot = ActiveSlot::acquire(&self.active_users, &user_id)
            .ok_or_else(|| GradeError::UserBusy(user_id.clone()))?;

        let run_id = Uuid::new_v4();
        tracing::info!(
            %run_id,
            user = %user_id,
            exercise = %submission.exercise_id,
            %tier,
            "grading run started"
        );

        let mut tracker = RunTracker::new();

        let exercise = self.repository.get_exercise(&submission.exercise_id).await?;

        let mut cases = exercise.test_cases.clone();
        if tier.gets_advanced_cases() {
            let supplementary = self.repository.advanced_test_cases(&exercise.id).await?;
            tracing::debug!(
                count = supplementary.len(),
                "appending advanced test cases for highest-tier learner"
            );
            cases = extend_cases(cases, supplementary);
        }

        tracker.advance(RunState::Executing);
        let profile = ExecutionProfile::for_exercise(&exercise);
        let harness = run_cases(
            self.sandbox.as_ref(),
            &submission.source,
            &cases,
            &profile,
            exercise.isolation,
            self.config.case_timeout,
        )
        .await?;

        match &harness.short_circuit {
            Some(ShortCircuit::Syntax(message)) => {
                tracing::warn!(%run_id, "submission failed to load: {message}");
                tracker.advance(RunState::SyntaxFailed);
            }
            Some(ShortCircuit::Timeout(bound_ms)) => {
                tracing::warn!(%run_id, bound_ms, "submission timed out, pending cases aborted");
                tracker.advance(RunState::TimedOut);
            }
            None => tracker.advance(RunState::TestsRunning),
        }
        tracker.advance(RunState::TestsComplete);

        let analysis = self.analyzer.analyze(&submission.source);
        tracker.advance(RunState::Analyzed);

        let record = ProgressRecord::build(&submission, harness.results, analysis);
        tracker.advance(RunState::Scored);

        // Both must resolve (success or explicit error) before the
        // recommendation step; recommendations never precede a durable
        // write decision.
        let (saved, metrics_sent) = tokio::join!(
            self.store.save_progress(&user_id, &exercise.id, &record),
            self.analytics
                .update_metrics(&user_id, &exercise.id, &record.metrics),
        );
        if let Err(err) = metrics_sent {
            tracing::warn!(%run_id, "analytics update failed: {err:#}");
        }
        let persistence_error = saved.err();
        if let Some(err) = &persistence_error {
            tracing::error!(%run_id, "progress write failed: {err}");
        }

        let mut recommendation = None;
        if record.completed {
            tracker.advance(RunState::Recommended);
            match next_exercise(
                self.repository.as_ref(),
                self.store.as_ref(),
                &user_id,
                &exercise.id,
            )
            .await
            {
                Ok(next) => recommendation = next,
                Err(err) => tracing::warn!(%run_id, "recommendation lookup failed: {err}"),
            }
        }

        let final_state = tracker.state();
        tracing::info!(
            %run_id,
            accuracy = record.metrics.accuracy,
            completed = record.completed,
            %final_state,
            "grading run finished"
        );

        Ok(GradeOutcome {
            run_id,
            record,
            recommendation,
            persistence_error,
            final_state,
        })
    }
}

/// Holds the per-user slot in the active set; released on drop so the
/// gate opens again on every exit path.
struct ActiveSlot<'a> {
    active_users: &'a Mutex<HashSet<String>>,
    user_id: String,
}

impl<'a> ActiveSlot<'a> {
    fn acquire(active_users: &'a Mutex<HashSet<String>>, user_id: &str) -> Option<Self> {
        let mut active = active_users.lock().expect("active-user set poisoned");
        if !active.insert(user_id.to_string()) {
            return None;
        }
        Some(Self {
            active_users,
            user_id: user_id.to_string(),
        })
    }
}

impl Drop for ActiveSlot<'_> {
    fn drop(&mut self) {
        let mut active = self
            .active_users
            .lock()
            .expect("active-user set poisoned");
        active.remove(&self.user_id);
    }
}
