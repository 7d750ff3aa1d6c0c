//! Test harness: drives an exercise's test cases against a sandbox.
//!
//! Cases run strictly in declared order, one live sandbox per run,
//! and every path produces exactly one result per case.

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::model::{IsolationPolicy, TestCase};
use crate::results::{ExecutionOutcome, TestResult};
use crate::traits::{ExecutionProfile, SandboxExecutor, SandboxSession, SessionStart};

/// What the harness produced for one run.
pub struct HarnessOutcome {
    /// One entry per test case, in declared order.
    pub results: Vec<TestResult>,
    /// Set when the run ended early on a uniform failure.
    pub short_circuit: Option<ShortCircuit>,
}

/// Why a run stopped before reaching every case normally.
#[derive(Debug, Clone, PartialEq)]
pub enum ShortCircuit {
    /// The source failed to load; every case carries the same message.
    Syntax(String),
    /// An invocation hit the wall-clock bound; pending cases were
    /// marked not attempted.
    Timeout(u64),
}

/// Run `cases` against `source` in declared order.
///
/// `Err` is reserved for host-side sandbox faults; submission failures
/// of any kind come back as failed results.
pub async fn run_cases(
    sandbox: &dyn SandboxExecutor,
    source: &str,
    cases: &[TestCase],
    profile: &ExecutionProfile,
    isolation: IsolationPolicy,
    timeout: Duration,
) -> Result<HarnessOutcome> {
    let mut results: Vec<TestResult> = Vec::with_capacity(cases.len());
    let mut short_circuit = None;
    let mut session: Option<Box<dyn SandboxSession>> = None;

    let mut index = 0;
    while index < cases.len() {
        let case = &cases[index];

        if session.is_none() {
            match sandbox.start(source, profile).await? {
                SessionStart::Ready(live) => session = Some(live),
                SessionStart::SyntaxFailure(message) => {
                    tracing::debug!(case = index, "submission failed to load: {message}");
                    fail_pending(&mut results, &cases[index..], &message);
                    short_circuit = Some(ShortCircuit::Syntax(message));
                    break;
                }
            }
        }
        let live = session.as_mut().expect("session present after start");

        let started = Instant::now();
        let outcome = live.invoke(&case.input, timeout).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            ExecutionOutcome::Value(actual) => {
                let passed = case.expected.matches(&actual);
                results.push(TestResult {
                    input: case.input.clone(),
                    actual: Some(actual),
                    error: None,
                    passed,
                    duration_ms: elapsed_ms,
                    attempted: true,
                });
            }
            ExecutionOutcome::RuntimeFailure { message, stack } => {
                if let Some(stack) = stack {
                    tracing::debug!(case = index, "submission stack trace:\n{stack}");
                }
                results.push(TestResult {
                    input: case.input.clone(),
                    actual: None,
                    error: Some(message),
                    passed: false,
                    duration_ms: elapsed_ms,
                    attempted: true,
                });
            }
            ExecutionOutcome::TimedOut => {
                let bound_ms = timeout.as_millis() as u64;
                results.push(TestResult {
                    input: case.input.clone(),
                    actual: None,
                    error: Some(format!("execution timed out after {bound_ms}ms")),
                    passed: false,
                    // Recorded as the bound itself, never beyond it.
                    duration_ms: bound_ms,
                    attempted: true,
                });
                fail_pending(
                    &mut results,
                    &cases[index + 1..],
                    &format!("not attempted: an earlier case timed out after {bound_ms}ms"),
                );
                short_circuit = Some(ShortCircuit::Timeout(bound_ms));
                break;
            }
            ExecutionOutcome::SyntaxFailure(message) => {
                // Sessions normally report this at load time; treat a
                // late report uniformly for this and every pending case.
                fail_pending(&mut results, &cases[index..], &message);
                short_circuit = Some(ShortCircuit::Syntax(message));
                break;
            }
        }

        if isolation == IsolationPolicy::FreshPerCase {
            if let Some(mut live) = session.take() {
                live.terminate().await;
            }
        }
        index += 1;
    }

    if let Some(mut live) = session.take() {
        live.terminate().await;
    }

    debug_assert_eq!(results.len(), cases.len());
    Ok(HarnessOutcome {
        results,
        short_circuit,
    })
}

/// Append supplementary cases behind the authored suite, preserving
/// both orders.
pub fn extend_cases(mut authored: Vec<TestCase>, supplementary: Vec<TestCase>) -> Vec<TestCase> {
    authored.extend(supplementary);
    authored
}

/// Synthesize one failed, unattempted result per pending case so the
/// result list always matches the case list.
fn fail_pending(results: &mut Vec<TestResult>, pending: &[TestCase], message: &str) {
    for case in pending {
        results.push(TestResult::not_attempted(case.input.clone(), message));
    }
}

// The tests for this module live in `tests/harness.rs`: they need the
// sandbox mocks, and `skillforge-sandbox` depends on this crate, so a
// unit-test module here would see a second, non-unifying build of the
// `SandboxExecutor` trait.
