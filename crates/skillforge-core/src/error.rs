//! Grading error taxonomy.
//!
//! Defined centrally so callers can classify failures without string
//! matching. Sandbox syntax and timeout errors are absorbed by the
//! test harness and converted into failed results; they appear here
//! for collaborators that need to speak the same vocabulary.

use thiserror::Error;

/// Errors surfaced by the grading core.
#[derive(Debug, Error)]
pub enum GradeError {
    /// The submission could not be loaded or evaluated at all.
    #[error("syntax error: {0}")]
    SandboxSyntax(String),

    /// The submission threw during a single invocation.
    #[error("runtime error: {message}")]
    SandboxRuntime {
        message: String,
        stack: Option<String>,
    },

    /// A sandbox invocation exceeded its wall-clock bound.
    #[error("execution timed out after {0}ms")]
    SandboxTimeout(u64),

    /// The exercise repository does not know the requested id.
    /// Aborts the run before execution begins.
    #[error("exercise not found: {0}")]
    RepositoryNotFound(String),

    /// The progress write failed. Scoring still succeeded; the record
    /// is handed back alongside this error.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// A grading run is already active for this user. The request is
    /// rejected, never queued.
    #[error("a grading run is already active for user {0}")]
    UserBusy(String),

    /// Host-side fault (sandbox could not be brought up, catalog I/O).
    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

impl GradeError {
    /// Whether this is the busy rejection from the per-user gate.
    pub fn is_busy(&self) -> bool {
        matches!(self, GradeError::UserBusy(_))
    }
}

impl From<anyhow::Error> for GradeError {
    fn from(err: anyhow::Error) -> Self {
        GradeError::Internal(err)
    }
}
