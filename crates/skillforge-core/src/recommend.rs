//! Next-exercise recommendation.
//!
//! Deterministic, no randomness: the first unattempted exercise in
//! the same category in declared order, then the first exercise of
//! the next category, never an exercise the user already completed.

use std::collections::HashSet;

use crate::error::GradeError;
use crate::traits::{ExerciseRepository, ProgressStore};

/// Select the next exercise to suggest after `exercise_id`.
///
/// Returns `None` when no uncompleted exercise remains anywhere in
/// the catalog.
pub async fn next_exercise(
    repository: &dyn ExerciseRepository,
    store: &dyn ProgressStore,
    user_id: &str,
    exercise_id: &str,
) -> Result<Option<String>, GradeError> {
    let summary = store.get_progress(user_id).await?;
    let completed: HashSet<String> = summary.completed.into_iter().collect();

    let mut cursor = exercise_id.to_string();
    loop {
        let candidate = match repository.next_in_category(&cursor).await? {
            Some(id) => id,
            None => match repository.first_in_next_category(&cursor).await? {
                Some(id) => id,
                None => return Ok(None),
            },
        };
        if !completed.contains(&candidate) {
            tracing::debug!(user = user_id, next = %candidate, "recommending next exercise");
            return Ok(Some(candidate));
        }
        cursor = candidate;
    }
}
