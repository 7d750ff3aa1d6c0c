//! Harness tests. These live as an integration test rather than a unit
//! test module because `skillforge-sandbox` depends on
//! `skillforge-core`: inside the lib's own test build the crate is
//! compiled a second time, so the `SandboxExecutor` trait the mock
//! implements would not unify with the one under test.

use std::time::Duration;

use serde_json::json;

use skillforge_core::harness::{extend_cases, run_cases, ShortCircuit};
use skillforge_core::model::{Expected, IsolationPolicy, TestCase};
use skillforge_core::traits::ExecutionProfile;
use skillforge_sandbox::{MockBehavior, MockSandbox};

fn case(input: serde_json::Value, expected: serde_json::Value) -> TestCase {
    TestCase {
        input,
        expected: Expected::Exact(expected),
    }
}

fn profile() -> ExecutionProfile {
    ExecutionProfile {
        entry_point: "main".to_string(),
        allow_network: false,
    }
}

const TIMEOUT: Duration = Duration::from_millis(5000);

#[tokio::test]
async fn cases_run_in_order_on_one_session() {
    let sandbox = MockSandbox::echo();
    let cases = vec![
        case(json!("a"), json!("a")),
        case(json!("b"), json!("b")),
        case(json!("c"), json!("nope")),
    ];

    let outcome = run_cases(
        &sandbox,
        "src",
        &cases,
        &profile(),
        IsolationPolicy::Reuse,
        TIMEOUT,
    )
    .await
    .unwrap();

    assert!(outcome.short_circuit.is_none());
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.results[0].input, json!("a"));
    assert_eq!(outcome.results[1].input, json!("b"));
    assert!(outcome.results[0].passed && outcome.results[1].passed);
    assert!(!outcome.results[2].passed);
    assert!(outcome.results.iter().all(|r| r.attempted));
    assert_eq!(sandbox.starts(), 1);
}

#[tokio::test]
async fn fresh_per_case_restarts_the_sandbox() {
    let sandbox = MockSandbox::echo();
    let cases = vec![case(json!(1), json!(1)), case(json!(2), json!(2))];

    run_cases(
        &sandbox,
        "src",
        &cases,
        &profile(),
        IsolationPolicy::FreshPerCase,
        TIMEOUT,
    )
    .await
    .unwrap();

    assert_eq!(sandbox.starts(), 2);
}

#[tokio::test]
async fn syntax_failure_fails_every_case_uniformly() {
    let sandbox = MockSandbox::syntax_failure("Unexpected token '}'");
    let cases = vec![
        case(json!(1), json!(1)),
        case(json!(2), json!(2)),
        case(json!(3), json!(3)),
    ];

    let outcome = run_cases(
        &sandbox,
        "}{",
        &cases,
        &profile(),
        IsolationPolicy::Reuse,
        TIMEOUT,
    )
    .await
    .unwrap();

    assert_eq!(
        outcome.short_circuit,
        Some(ShortCircuit::Syntax("Unexpected token '}'".to_string()))
    );
    assert_eq!(outcome.results.len(), 3);
    for result in &outcome.results {
        assert!(!result.passed);
        assert!(!result.attempted);
        assert_eq!(result.duration_ms, 0);
        assert_eq!(result.error.as_deref(), Some("Unexpected token '}'"));
    }
    assert_eq!(sandbox.invocations(), 0);
}

#[tokio::test]
async fn runtime_failure_does_not_stop_the_run() {
    let sandbox = MockSandbox::scripted(vec![
        MockBehavior::Fail("boom".to_string()),
        MockBehavior::Value(json!(2)),
    ]);
    let cases = vec![case(json!(1), json!(1)), case(json!(2), json!(2))];

    let outcome = run_cases(
        &sandbox,
        "src",
        &cases,
        &profile(),
        IsolationPolicy::Reuse,
        TIMEOUT,
    )
    .await
    .unwrap();

    assert!(outcome.short_circuit.is_none());
    assert!(!outcome.results[0].passed);
    assert_eq!(outcome.results[0].error.as_deref(), Some("boom"));
    assert!(outcome.results[0].attempted);
    assert!(outcome.results[1].passed);
}

#[tokio::test(start_paused = true)]
async fn timeout_aborts_pending_cases() {
    let sandbox = MockSandbox::scripted(vec![
        MockBehavior::Value(json!(1)),
        MockBehavior::Hang,
        MockBehavior::Value(json!(3)),
    ]);
    let cases = vec![
        case(json!(1), json!(1)),
        case(json!(2), json!(2)),
        case(json!(3), json!(3)),
    ];

    let outcome = run_cases(
        &sandbox,
        "src",
        &cases,
        &profile(),
        IsolationPolicy::Reuse,
        TIMEOUT,
    )
    .await
    .unwrap();

    assert_eq!(outcome.short_circuit, Some(ShortCircuit::Timeout(5000)));
    assert_eq!(outcome.results.len(), 3);

    assert!(outcome.results[0].passed);

    let timed_out = &outcome.results[1];
    assert!(timed_out.attempted);
    assert_eq!(timed_out.duration_ms, 5000);
    assert_eq!(
        timed_out.error.as_deref(),
        Some("execution timed out after 5000ms")
    );

    let pending = &outcome.results[2];
    assert!(!pending.attempted);
    assert_eq!(pending.duration_ms, 0);
    assert!(pending.error.as_deref().unwrap().contains("not attempted"));
    // The third scripted behavior was never consumed.
    assert_eq!(sandbox.invocations(), 2);
}

#[test]
fn extend_preserves_both_orders() {
    let combined = extend_cases(
        vec![case(json!(1), json!(1)), case(json!(2), json!(2))],
        vec![case(json!(3), json!(3))],
    );
    let inputs: Vec<_> = combined.iter().map(|c| c.input.clone()).collect();
    assert_eq!(inputs, vec![json!(1), json!(2), json!(3)]);
}
