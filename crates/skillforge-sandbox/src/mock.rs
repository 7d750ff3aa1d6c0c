//! Mock sandbox for testing the grading pipeline without a runtime.
//!
//! Behaviors are scripted per invocation, so harness and engine tests
//! can exercise every outcome (values, throws, timeouts, syntax
//! failures) deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use skillforge_core::results::ExecutionOutcome;
use skillforge_core::traits::{ExecutionProfile, SandboxExecutor, SandboxSession, SessionStart};

/// What one scripted invocation does.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this value.
    Value(Value),
    /// Throw with this message.
    Fail(String),
    /// Never return; the session reports a timeout after the bound.
    Hang,
}

enum MockMode {
    /// Echo the invocation arguments back as the value.
    Echo,
    /// Pop one behavior per invocation. Shared across sessions so the
    /// script continues through fresh-per-case restarts.
    Scripted(Arc<Mutex<VecDeque<MockBehavior>>>),
    /// Refuse to load any source.
    SyntaxFailure(String),
}

/// A sandbox whose sessions follow a fixed script.
pub struct MockSandbox {
    mode: MockMode,
    starts: AtomicU32,
    invocations: Arc<AtomicU32>,
}

impl MockSandbox {
    /// Sessions echo their arguments back.
    pub fn echo() -> Self {
        Self::with_mode(MockMode::Echo)
    }

    /// Sessions consume `behaviors` one per invocation, in order.
    pub fn scripted(behaviors: Vec<MockBehavior>) -> Self {
        Self::with_mode(MockMode::Scripted(Arc::new(Mutex::new(
            behaviors.into_iter().collect(),
        ))))
    }

    /// Every `start` reports a syntax failure with this message.
    pub fn syntax_failure(message: &str) -> Self {
        Self::with_mode(MockMode::SyntaxFailure(message.to_string()))
    }

    fn with_mode(mode: MockMode) -> Self {
        Self {
            mode,
            starts: AtomicU32::new(0),
            invocations: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Number of sessions started.
    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::Relaxed)
    }

    /// Number of invocations across all sessions.
    pub fn invocations(&self) -> u32 {
        self.invocations.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SandboxExecutor for MockSandbox {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start(
        &self,
        _source: &str,
        _profile: &ExecutionProfile,
    ) -> anyhow::Result<SessionStart> {
        self.starts.fetch_add(1, Ordering::Relaxed);
        let script = match &self.mode {
            MockMode::Echo => None,
            MockMode::Scripted(script) => Some(Arc::clone(script)),
            MockMode::SyntaxFailure(message) => {
                return Ok(SessionStart::SyntaxFailure(message.clone()));
            }
        };
        Ok(SessionStart::Ready(Box::new(MockSession {
            script,
            invocations: Arc::clone(&self.invocations),
            terminated: false,
        })))
    }
}

struct MockSession {
    /// `None` echoes arguments back.
    script: Option<Arc<Mutex<VecDeque<MockBehavior>>>>,
    invocations: Arc<AtomicU32>,
    terminated: bool,
}

#[async_trait]
impl SandboxSession for MockSession {
    async fn invoke(&mut self, args: &Value, timeout: Duration) -> ExecutionOutcome {
        if self.terminated {
            return ExecutionOutcome::RuntimeFailure {
                message: "session terminated".to_string(),
                stack: None,
            };
        }
        self.invocations.fetch_add(1, Ordering::Relaxed);

        let behavior = match &self.script {
            None => return ExecutionOutcome::Value(args.clone()),
            Some(script) => script.lock().unwrap().pop_front(),
        };
        match behavior {
            Some(MockBehavior::Value(value)) => ExecutionOutcome::Value(value),
            Some(MockBehavior::Fail(message)) => ExecutionOutcome::RuntimeFailure {
                message,
                stack: None,
            },
            Some(MockBehavior::Hang) => {
                tokio::time::sleep(timeout).await;
                self.terminated = true;
                ExecutionOutcome::TimedOut
            }
            None => ExecutionOutcome::RuntimeFailure {
                message: "mock script exhausted".to_string(),
                stack: None,
            },
        }
    }

    async fn terminate(&mut self) {
        self.terminated = true;
    }
}
