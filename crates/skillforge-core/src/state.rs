//! Explicit state machine for one grading run.
//!
//! `Idle → Executing → {SyntaxFailed | TimedOut | TestsRunning} →
//! TestsComplete → Analyzed → Scored → [Recommended] → Idle`.
//! Syntax failures and timeouts are non-fatal terminal branches that
//! still flow into analysis and scoring with accuracy 0.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a grading run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Executing,
    SyntaxFailed,
    TimedOut,
    TestsRunning,
    TestsComplete,
    Analyzed,
    Scored,
    Recommended,
}

impl RunState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Executing)
                | (Executing, SyntaxFailed)
                | (Executing, TimedOut)
                | (Executing, TestsRunning)
                | (SyntaxFailed, TestsComplete)
                | (TimedOut, TestsComplete)
                | (TestsRunning, TestsComplete)
                | (TestsComplete, Analyzed)
                | (Analyzed, Scored)
                | (Scored, Recommended)
                | (Scored, Idle)
                | (Recommended, Idle)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Executing => "executing",
            RunState::SyntaxFailed => "syntax_failed",
            RunState::TimedOut => "timed_out",
            RunState::TestsRunning => "tests_running",
            RunState::TestsComplete => "tests_complete",
            RunState::Analyzed => "analyzed",
            RunState::Scored => "scored",
            RunState::Recommended => "recommended",
        };
        write!(f, "{name}")
    }
}

/// Tracks one run's progress through the state machine.
#[derive(Debug)]
pub struct RunTracker {
    state: RunState,
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Advance to `next`. Transitions are driven by the engine, so an
    /// illegal one is a pipeline bug.
    pub fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_advance(next),
            "illegal run-state transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "run state transition");
        self.state = next;
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}
