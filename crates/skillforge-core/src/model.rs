//! Core data model types for skillforge.
//!
//! These are the fundamental types the grading engine operates on:
//! exercises, test cases, and learner submissions. Exercises are
//! immutable and owned by an [`ExerciseRepository`](crate::traits::ExerciseRepository);
//! submissions exist only for the duration of one grading run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A practice exercise with its authored test suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    /// Unique identifier for this exercise.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Description shown to the learner.
    #[serde(default)]
    pub description: String,
    /// Category this exercise belongs to (e.g. "basics", "practical").
    pub category: String,
    /// Starter source text handed to the learner.
    #[serde(default)]
    pub initial_code: String,
    /// Name of the function the sandbox invokes per test case.
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    /// Ordered test cases. Results are produced in this order.
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    /// Optional worked steps shown alongside the exercise.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Optional supporting material.
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// Whether the sandbox may be reused across test cases.
    #[serde(default)]
    pub isolation: IsolationPolicy,
    /// Whether the submission may use the restricted network stub.
    #[serde(default)]
    pub allow_network: bool,
}

fn default_entry_point() -> String {
    "main".to_string()
}

/// A single test case: an input value and what the output must be.
///
/// An array input is spread across the entry point's parameters;
/// any other value is passed as a single argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Input handed to the entry point.
    pub input: Value,
    /// Expected-output specification.
    pub expected: Expected,
}

/// Expected-output specification for a test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expected {
    /// Pass iff the actual output equals this value structurally.
    Exact(Value),
    /// Pass iff the actual output is a member of this set. Used for
    /// exercises with several correct phrasings. Exact comparison,
    /// no trimming or case folding.
    AnyOf(Vec<Value>),
}

impl Expected {
    /// Apply the pass rule to an actual output value.
    pub fn matches(&self, actual: &Value) -> bool {
        match self {
            Expected::Exact(value) => actual == value,
            Expected::AnyOf(values) => values.iter().any(|v| v == actual),
        }
    }
}

/// A worked step attached to a practical exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub title: String,
    pub content: String,
}

/// Supporting material attached to an exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Duration for videos, reading time for articles.
    #[serde(default)]
    pub length: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Video,
    Article,
}

/// Whether one sandbox instance may serve every test case in a run.
///
/// Exercises whose code carries observable internal state default to
/// reuse; exercises marked stateless-required get a fresh instance
/// per case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationPolicy {
    #[default]
    Reuse,
    FreshPerCase,
}

/// Coarse per-user skill classification.
///
/// Learners at the highest tier get supplementary test cases appended
/// to the authored suite before execution begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyTier {
    Beginner,
    Intermediate,
    Advanced,
}

impl ProficiencyTier {
    /// Whether this tier receives supplementary test cases.
    pub fn gets_advanced_cases(self) -> bool {
        self == ProficiencyTier::Advanced
    }
}

impl fmt::Display for ProficiencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProficiencyTier::Beginner => write!(f, "beginner"),
            ProficiencyTier::Intermediate => write!(f, "intermediate"),
            ProficiencyTier::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for ProficiencyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(ProficiencyTier::Beginner),
            "intermediate" => Ok(ProficiencyTier::Intermediate),
            "advanced" => Ok(ProficiencyTier::Advanced),
            other => Err(format!("unknown proficiency tier: {other}")),
        }
    }
}

/// A learner's source-code submission for one exercise.
///
/// Created per grading request and never persisted itself; only the
/// derived [`ProgressRecord`](crate::results::ProgressRecord) is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub exercise_id: String,
    pub user_id: String,
    /// Raw source text as typed by the learner.
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(exercise_id: &str, user_id: &str, source: &str) -> Self {
        Self {
            exercise_id: exercise_id.to_string(),
            user_id: user_id.to_string(),
            source: source.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// An ordered group of exercises. Category order is declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseCategory {
    pub name: String,
    pub exercises: Vec<Exercise>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_expected_uses_deep_equality() {
        let expected = Expected::Exact(json!({"score": 1, "sentiment": "positive"}));
        assert!(expected.matches(&json!({"sentiment": "positive", "score": 1})));
        assert!(!expected.matches(&json!({"score": 2, "sentiment": "positive"})));
    }

    #[test]
    fn any_of_is_membership_without_folding() {
        let expected = Expected::AnyOf(vec![json!("Hi!"), json!("Hello!")]);
        assert!(expected.matches(&json!("Hello!")));
        assert!(!expected.matches(&json!("hello!")));
        assert!(!expected.matches(&json!("Hello! ")));
    }

    #[test]
    fn tier_display_and_parse() {
        assert_eq!(ProficiencyTier::Advanced.to_string(), "advanced");
        assert_eq!(
            "Advanced".parse::<ProficiencyTier>().unwrap(),
            ProficiencyTier::Advanced
        );
        assert!("expert".parse::<ProficiencyTier>().is_err());
        assert!(ProficiencyTier::Advanced.gets_advanced_cases());
        assert!(!ProficiencyTier::Beginner.gets_advanced_cases());
    }

    #[test]
    fn exercise_serde_defaults() {
        let json = r#"{
            "id": "chatbot-basic",
            "title": "Basic chatbot",
            "category": "practical",
            "test_cases": [
                {"input": "hello", "expected": {"any_of": ["Hi!", "Hey!"]}}
            ]
        }"#;
        let exercise: Exercise = serde_json::from_str(json).unwrap();
        assert_eq!(exercise.entry_point, "main");
        assert_eq!(exercise.isolation, IsolationPolicy::Reuse);
        assert!(!exercise.allow_network);
        assert_eq!(exercise.test_cases.len(), 1);
    }
}
