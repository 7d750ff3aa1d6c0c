//! In-memory collaborator implementations.
//!
//! Used by the engine tests and by embedding callers that keep the
//! catalog and progress in process (the original platform stored both
//! client-side). Each type records enough about how it was called for
//! assertions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GradeError;
use crate::model::{Exercise, ExerciseCategory, TestCase};
use crate::results::{MetricsBundle, ProgressRecord};
use crate::traits::{
    AnalyticsSink, ExerciseRepository, InProgressEntry, ProgressStore, ProgressSummary,
};

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Exercise repository over an in-memory catalog. Category and
/// exercise order is declaration order.
pub struct MemoryRepository {
    categories: Vec<ExerciseCategory>,
    advanced: HashMap<String, Vec<TestCase>>,
}

impl MemoryRepository {
    pub fn new(categories: Vec<ExerciseCategory>) -> Self {
        Self {
            categories,
            advanced: HashMap::new(),
        }
    }

    /// Register supplementary cases for highest-tier learners.
    pub fn with_advanced_cases(mut self, exercise_id: &str, cases: Vec<TestCase>) -> Self {
        self.advanced.insert(exercise_id.to_string(), cases);
        self
    }

    /// Locate an exercise as (category index, exercise index).
    fn position(&self, exercise_id: &str) -> Option<(usize, usize)> {
        self.categories.iter().enumerate().find_map(|(ci, cat)| {
            cat.exercises
                .iter()
                .position(|e| e.id == exercise_id)
                .map(|ei| (ci, ei))
        })
    }

    fn not_found(exercise_id: &str) -> GradeError {
        GradeError::RepositoryNotFound(exercise_id.to_string())
    }
}

#[async_trait]
impl ExerciseRepository for MemoryRepository {
    async fn get_exercise(&self, id: &str) -> Result<Exercise, GradeError> {
        let (ci, ei) = self.position(id).ok_or_else(|| Self::not_found(id))?;
        Ok(self.categories[ci].exercises[ei].clone())
    }

    async fn advanced_test_cases(&self, exercise_id: &str) -> Result<Vec<TestCase>, GradeError> {
        if self.position(exercise_id).is_none() {
            return Err(Self::not_found(exercise_id));
        }
        Ok(self.advanced.get(exercise_id).cloned().unwrap_or_default())
    }

    async fn next_in_category(&self, exercise_id: &str) -> Result<Option<String>, GradeError> {
        let (ci, ei) = self
            .position(exercise_id)
            .ok_or_else(|| Self::not_found(exercise_id))?;
        Ok(self.categories[ci]
            .exercises
            .get(ei + 1)
            .map(|e| e.id.clone()))
    }

    async fn first_in_next_category(
        &self,
        exercise_id: &str,
    ) -> Result<Option<String>, GradeError> {
        let (ci, _) = self
            .position(exercise_id)
            .ok_or_else(|| Self::not_found(exercise_id))?;
        Ok(self
            .categories
            .iter()
            .skip(ci + 1)
            .find_map(|cat| cat.exercises.first().map(|e| e.id.clone())))
    }
}

// ---------------------------------------------------------------------------
// Progress store
// ---------------------------------------------------------------------------

/// Progress store keeping the latest record per (user, exercise).
#[derive(Default)]
pub struct MemoryProgressStore {
    records: Mutex<HashMap<String, HashMap<String, ProgressRecord>>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored record for one user and exercise, if any.
    pub fn record_for(&self, user_id: &str, exercise_id: &str) -> Option<ProgressRecord> {
        self.records
            .lock()
            .unwrap()
            .get(user_id)
            .and_then(|per_user| per_user.get(exercise_id))
            .cloned()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn save_progress(
        &self,
        user_id: &str,
        exercise_id: &str,
        record: &ProgressRecord,
    ) -> Result<(), GradeError> {
        self.records
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .insert(exercise_id.to_string(), record.clone());
        Ok(())
    }

    async fn get_progress(&self, user_id: &str) -> Result<ProgressSummary, GradeError> {
        let records = self.records.lock().unwrap();
        let mut summary = ProgressSummary::default();
        if let Some(per_user) = records.get(user_id) {
            let mut ids: Vec<&String> = per_user.keys().collect();
            ids.sort();
            for id in ids {
                let record = &per_user[id];
                if record.completed {
                    summary.completed.push(id.clone());
                } else {
                    summary.in_progress.push(InProgressEntry {
                        id: id.clone(),
                        accuracy: record.metrics.accuracy,
                    });
                }
            }
        }
        Ok(summary)
    }
}

/// A store whose writes always fail, for exercising degraded success.
#[derive(Default)]
pub struct FailingProgressStore {
    attempts: AtomicU32,
}

impl FailingProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ProgressStore for FailingProgressStore {
    async fn save_progress(
        &self,
        _user_id: &str,
        _exercise_id: &str,
        _record: &ProgressRecord,
    ) -> Result<(), GradeError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        Err(GradeError::Persistence("store unavailable".to_string()))
    }

    async fn get_progress(&self, _user_id: &str) -> Result<ProgressSummary, GradeError> {
        Ok(ProgressSummary::default())
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// Analytics sink that records every bundle it receives. Can be made
/// to fail to exercise the best-effort contract.
#[derive(Default)]
pub struct RecordingAnalytics {
    updates: Mutex<Vec<(String, String, MetricsBundle)>>,
    fail: bool,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            updates: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn updates(&self) -> Vec<(String, String, MetricsBundle)> {
        self.updates.lock().unwrap().clone()
    }
}

/// Analytics sink that discards everything, for embedders that do not
/// track learning analytics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnalytics;

#[async_trait]
impl AnalyticsSink for NullAnalytics {
    async fn update_metrics(
        &self,
        _user_id: &str,
        _exercise_id: &str,
        _metrics: &MetricsBundle,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl AnalyticsSink for RecordingAnalytics {
    async fn update_metrics(
        &self,
        user_id: &str,
        exercise_id: &str,
        metrics: &MetricsBundle,
    ) -> anyhow::Result<()> {
        self.updates.lock().unwrap().push((
            user_id.to_string(),
            exercise_id.to_string(),
            metrics.clone(),
        ));
        if self.fail {
            anyhow::bail!("analytics endpoint unreachable");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Expected, IsolationPolicy};
    use serde_json::json;

    fn exercise(id: &str, category: &str) -> Exercise {
        Exercise {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            category: category.to_string(),
            initial_code: String::new(),
            entry_point: "main".to_string(),
            test_cases: vec![TestCase {
                input: json!(1),
                expected: Expected::Exact(json!(1)),
            }],
            steps: vec![],
            resources: vec![],
            isolation: IsolationPolicy::Reuse,
            allow_network: false,
        }
    }

    fn repo() -> MemoryRepository {
        MemoryRepository::new(vec![
            ExerciseCategory {
                name: "basics".to_string(),
                exercises: vec![exercise("b1", "basics"), exercise("b2", "basics")],
            },
            ExerciseCategory {
                name: "practical".to_string(),
                exercises: vec![exercise("p1", "practical")],
            },
        ])
    }

    #[tokio::test]
    async fn lookup_and_not_found() {
        let repo = repo();
        assert_eq!(repo.get_exercise("b2").await.unwrap().id, "b2");
        assert!(matches!(
            repo.get_exercise("missing").await,
            Err(GradeError::RepositoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn category_navigation() {
        let repo = repo();
        assert_eq!(
            repo.next_in_category("b1").await.unwrap(),
            Some("b2".to_string())
        );
        assert_eq!(repo.next_in_category("b2").await.unwrap(), None);
        assert_eq!(
            repo.first_in_next_category("b2").await.unwrap(),
            Some("p1".to_string())
        );
        assert_eq!(repo.first_in_next_category("p1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn advanced_cases_default_empty() {
        let repo = repo().with_advanced_cases(
            "b1",
            vec![TestCase {
                input: json!(9),
                expected: Expected::Exact(json!(9)),
            }],
        );
        assert_eq!(repo.advanced_test_cases("b1").await.unwrap().len(), 1);
        assert!(repo.advanced_test_cases("b2").await.unwrap().is_empty());
        assert!(repo.advanced_test_cases("missing").await.is_err());
    }

    #[tokio::test]
    async fn progress_summary_splits_completed() {
        use crate::model::Submission;
        use crate::results::{
            AnalysisReport, ComplexityMetrics, QualityCheck, QualityReport, TestResult,
        };

        let analysis = AnalysisReport {
            complexity: ComplexityMetrics {
                lines: 1,
                branches: 0,
                functions: 0,
                cyclomatic: 1,
                score: 1.0,
            },
            quality: QualityReport {
                formatting: QualityCheck::clean(),
                naming: QualityCheck::clean(),
                commenting: QualityCheck::clean(),
                duplication: QualityCheck::clean(),
                score: 1.0,
            },
        };
        let passing = TestResult {
            input: json!(1),
            actual: Some(json!(1)),
            error: None,
            passed: true,
            duration_ms: 5,
            attempted: true,
        };
        let failing = TestResult {
            input: json!(1),
            actual: Some(json!(2)),
            error: None,
            passed: false,
            duration_ms: 5,
            attempted: true,
        };

        let store = MemoryProgressStore::new();
        let done = ProgressRecord::build(
            &Submission::new("b1", "u1", ""),
            vec![passing],
            analysis.clone(),
        );
        let partial =
            ProgressRecord::build(&Submission::new("b2", "u1", ""), vec![failing], analysis);
        store.save_progress("u1", "b1", &done).await.unwrap();
        store.save_progress("u1", "b2", &partial).await.unwrap();

        let summary = store.get_progress("u1").await.unwrap();
        assert_eq!(summary.completed, vec!["b1".to_string()]);
        assert_eq!(summary.in_progress.len(), 1);
        assert_eq!(summary.in_progress[0].id, "b2");
        assert_eq!(summary.in_progress[0].accuracy, 0.0);

        let empty = store.get_progress("nobody").await.unwrap();
        assert!(empty.completed.is_empty() && empty.in_progress.is_empty());
    }
}
