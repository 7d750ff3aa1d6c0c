//! TOML exercise-catalog parser.
//!
//! Loads catalogs from TOML files and validates them before they reach
//! the repository.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::model::{
    Exercise, ExerciseCategory, Expected, IsolationPolicy, Resource, ResourceKind, Step, TestCase,
};

/// A parsed, validated exercise catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub name: String,
    pub description: String,
    /// Categories in declared order; drives recommendation order.
    pub categories: Vec<ExerciseCategory>,
}

/// Intermediate TOML structure for catalog files.
#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    catalog: TomlCatalogHeader,
    #[serde(default)]
    categories: Vec<TomlCategory>,
}

#[derive(Debug, Deserialize)]
struct TomlCatalogHeader {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlCategory {
    name: String,
    #[serde(default)]
    exercises: Vec<TomlExercise>,
}

#[derive(Debug, Deserialize)]
struct TomlExercise {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    initial_code: String,
    #[serde(default = "default_entry_point")]
    entry_point: String,
    #[serde(default)]
    isolation: Option<String>,
    #[serde(default)]
    allow_network: bool,
    #[serde(default)]
    cases: Vec<TomlTestCase>,
    #[serde(default)]
    steps: Vec<TomlStep>,
    #[serde(default)]
    resources: Vec<TomlResource>,
}

fn default_entry_point() -> String {
    "main".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlTestCase {
    input: Option<toml::Value>,
    expected: Option<toml::Value>,
    any_of: Option<Vec<toml::Value>>,
}

#[derive(Debug, Deserialize)]
struct TomlStep {
    title: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct TomlResource {
    kind: String,
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    length: String,
}

/// Parse a catalog from a TOML file.
pub fn parse_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file: {}", path.display()))?;
    parse_catalog_str(&content)
}

/// Parse a catalog from a TOML string (useful for testing).
pub fn parse_catalog_str(content: &str) -> Result<Catalog> {
    let file: TomlCatalogFile = toml::from_str(content).context("failed to parse catalog TOML")?;

    let mut categories = Vec::with_capacity(file.categories.len());
    for category in file.categories {
        let mut exercises = Vec::with_capacity(category.exercises.len());
        for exercise in category.exercises {
            exercises.push(convert_exercise(exercise, &category.name)?);
        }
        categories.push(ExerciseCategory {
            name: category.name,
            exercises,
        });
    }

    let catalog = Catalog {
        name: file.catalog.name,
        description: file.catalog.description,
        categories,
    };
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn convert_exercise(exercise: TomlExercise, category: &str) -> Result<Exercise> {
    let isolation = match exercise.isolation.as_deref() {
        None | Some("reuse") => IsolationPolicy::Reuse,
        Some("fresh-per-case") => IsolationPolicy::FreshPerCase,
        Some(other) => bail!(
            "exercise '{}': unknown isolation policy '{other}'",
            exercise.id
        ),
    };

    let mut test_cases = Vec::with_capacity(exercise.cases.len());
    for (index, case) in exercise.cases.into_iter().enumerate() {
        let input = case
            .input
            .map(to_json)
            .transpose()?
            .unwrap_or(Value::Null);
        let expected = match (case.expected, case.any_of) {
            (Some(value), None) => Expected::Exact(to_json(value)?),
            (None, Some(values)) => {
                if values.is_empty() {
                    bail!(
                        "exercise '{}' case {index}: 'any_of' must not be empty",
                        exercise.id
                    );
                }
                Expected::AnyOf(values.into_iter().map(to_json).collect::<Result<_>>()?)
            }
            (Some(_), Some(_)) => bail!(
                "exercise '{}' case {index}: 'expected' and 'any_of' are mutually exclusive",
                exercise.id
            ),
            (None, None) => bail!(
                "exercise '{}' case {index}: one of 'expected' or 'any_of' is required",
                exercise.id
            ),
        };
        test_cases.push(TestCase { input, expected });
    }

    let mut resources = Vec::with_capacity(exercise.resources.len());
    for resource in exercise.resources {
        let kind = match resource.kind.as_str() {
            "video" => ResourceKind::Video,
            "article" => ResourceKind::Article,
            other => bail!(
                "exercise '{}': unknown resource kind '{other}'",
                exercise.id
            ),
        };
        resources.push(Resource {
            kind,
            title: resource.title,
            url: resource.url,
            length: resource.length,
        });
    }

    Ok(Exercise {
        id: exercise.id,
        title: exercise.title,
        description: exercise.description,
        category: category.to_string(),
        initial_code: exercise.initial_code,
        entry_point: exercise.entry_point,
        test_cases,
        steps: exercise
            .steps
            .into_iter()
            .map(|s| Step {
                title: s.title,
                content: s.content,
            })
            .collect(),
        resources,
        isolation,
        allow_network: exercise.allow_network,
    })
}

fn to_json(value: toml::Value) -> Result<Value> {
    serde_json::to_value(value).context("failed to convert TOML value")
}

/// Validate a catalog: unique ids, non-empty names and entry points.
pub fn validate_catalog(catalog: &Catalog) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for category in &catalog.categories {
        if category.name.is_empty() {
            bail!("catalog '{}': category with empty name", catalog.name);
        }
        for exercise in &category.exercises {
            if exercise.id.is_empty() {
                bail!("category '{}': exercise with empty id", category.name);
            }
            if !seen.insert(exercise.id.as_str()) {
                bail!("duplicate exercise id: {}", exercise.id);
            }
            if exercise.entry_point.is_empty() {
                bail!("exercise '{}': empty entry point", exercise.id);
            }
        }
    }
    Ok(())
}
