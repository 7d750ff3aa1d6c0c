//! Wire protocol between the host and the driver process.
//!
//! The driver emits newline-delimited JSON events on stdout; the host
//! sends one JSON invocation request per line on stdin. Everything
//! here is pure parsing, independent of any live process.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use skillforge_core::results::ExecutionOutcome;

/// One event emitted by the driver.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum DriverEvent {
    /// The submission loaded and the entry point resolved.
    Ready,
    /// The submission could not be compiled, evaluated, or its entry
    /// point is missing.
    Syntax { message: String },
    /// The entry point returned (or resolved to) a value.
    Value { value: Value },
    /// The invocation threw.
    Error {
        message: String,
        #[serde(default)]
        stack: Option<String>,
    },
}

/// One invocation request sent to the driver.
#[derive(Debug, Serialize)]
pub struct InvokeRequest<'a> {
    pub args: &'a Value,
}

/// Parse one stdout line from the driver.
pub fn parse_event(line: &str) -> Result<DriverEvent> {
    serde_json::from_str(line).with_context(|| format!("malformed driver event: {line}"))
}

impl DriverEvent {
    /// Map a post-handshake event onto an invocation outcome.
    ///
    /// `Ready` has no outcome; it only occurs during the handshake.
    pub fn into_outcome(self) -> Option<ExecutionOutcome> {
        match self {
            DriverEvent::Ready => None,
            DriverEvent::Syntax { message } => Some(ExecutionOutcome::SyntaxFailure(message)),
            DriverEvent::Value { value } => Some(ExecutionOutcome::Value(value)),
            DriverEvent::Error { message, stack } => {
                Some(ExecutionOutcome::RuntimeFailure { message, stack })
            }
        }
    }
}
