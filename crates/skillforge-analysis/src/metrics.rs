//! Structural metrics: line, branch, and function counts plus the
//! decision-keyword approximation of cyclomatic complexity.
//!
//! Everything here works on raw text; the submission does not need to
//! be syntactically valid.

use skillforge_core::results::{clamp_unit, ComplexityMetrics};

/// Decision-point keywords, matched on identifier boundaries.
const DECISION_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "catch",
];

/// Normalization ceilings for the complexity score.
const LINES_CAP: f64 = 100.0;
const BRANCHES_CAP: f64 = 20.0;
const FUNCTIONS_CAP: f64 = 10.0;
const CYCLOMATIC_CAP: f64 = 15.0;

fn identifier_like(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Identifier-shaped words in the source, in order.
pub(crate) fn words(source: &str) -> impl Iterator<Item = &str> {
    source
        .split(|c: char| !identifier_like(c))
        .filter(|word| !word.is_empty())
}

/// Count decision-point tokens: branch keywords, `&&`, `||`, and the
/// ternary `?`. String and comment contents are counted too; this is
/// a text heuristic, not a parse.
pub fn decision_points(source: &str) -> usize {
    let keywords = words(source)
        .filter(|word| DECISION_KEYWORDS.contains(word))
        .count();
    keywords + source.matches("&&").count() + source.matches("||").count() + ternaries(source)
}

/// `?` occurrences that are not `??` (nullish coalescing) or `?.`
/// (optional chaining).
fn ternaries(source: &str) -> usize {
    let bytes = source.as_bytes();
    (0..bytes.len())
        .filter(|&i| {
            bytes[i] == b'?'
                && (i == 0 || bytes[i - 1] != b'?')
                && bytes.get(i + 1).map_or(true, |&next| next != b'?' && next != b'.')
        })
        .count()
}

/// Function and lambda declarations: `function` keywords plus `=>` arrows.
pub fn function_count(source: &str) -> usize {
    let keywords = words(source).filter(|word| *word == "function").count();
    keywords + source.matches("=>").count()
}

/// Compute all structural metrics and the weighted complexity score.
///
/// Each raw metric is capped at its ceiling; the score is a weighted
/// sum of `1 - normalized` terms, so lower raw complexity scores
/// higher. Always in [0, 1].
pub fn measure(source: &str) -> ComplexityMetrics {
    let lines = source.lines().count();
    let branches = decision_points(source);
    let functions = function_count(source);
    let cyclomatic = 1 + branches;

    let norm = |value: usize, cap: f64| (value as f64 / cap).min(1.0);
    let score = 0.1 * (1.0 - norm(lines, LINES_CAP))
        + 0.3 * (1.0 - norm(branches, BRANCHES_CAP))
        + 0.2 * (1.0 - norm(functions, FUNCTIONS_CAP))
        + 0.4 * (1.0 - norm(cyclomatic, CYCLOMATIC_CAP));

    ComplexityMetrics {
        lines,
        branches,
        functions,
        cyclomatic,
        score: clamp_unit(score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_matched_on_boundaries() {
        // "iffy" and "formation" must not count as decision points.
        assert_eq!(decision_points("let iffy = formation;"), 0);
        assert_eq!(decision_points("if (a) { } else { }"), 2);
        assert_eq!(decision_points("while (a && b || c) {}"), 3);
    }

    #[test]
    fn ternary_but_not_chaining() {
        assert_eq!(decision_points("a ? b : c"), 1);
        assert_eq!(decision_points("a?.b"), 0);
        assert_eq!(decision_points("a ?? b"), 0);
    }

    #[test]
    fn functions_and_arrows() {
        let source = "function add(a, b) { return a + b; }\nconst inc = x => x + 1;";
        assert_eq!(function_count(source), 2);
    }

    #[test]
    fn cyclomatic_is_one_plus_branches() {
        let metrics = measure("if (a) { for (;;) { } }");
        assert_eq!(metrics.branches, 2);
        assert_eq!(metrics.cyclomatic, 3);
    }

    #[test]
    fn empty_source_scores_in_range() {
        let metrics = measure("");
        assert_eq!(metrics.lines, 0);
        assert_eq!(metrics.cyclomatic, 1);
        assert!(metrics.score >= 0.0 && metrics.score <= 1.0);
    }

    #[test]
    fn adversarially_large_source_clamps() {
        let branchy = "if if if ".repeat(500);
        let metrics = measure(&branchy);
        assert!(metrics.branches >= 1000);
        assert!(metrics.score >= 0.0 && metrics.score <= 1.0);
        // Branch and cyclomatic terms are fully capped out.
        assert!(metrics.score < 0.31);
    }
}
