//! Quality sub-checks: formatting, naming, commenting, duplication.
//!
//! Each check starts from 1.0, deducts a fixed penalty per detected
//! issue, and clamps at zero. The quality score is the arithmetic
//! mean of the four sub-scores.

use std::collections::HashMap;

use skillforge_core::results::{QualityCheck, QualityReport};

use crate::metrics::words;

const DECLARATION_KEYWORDS: &[&str] = &["let", "const", "var", "function"];

/// Minimum trimmed length for a line to participate in duplication
/// detection. Shorter lines (braces, `return`, etc.) repeat naturally.
const DUPLICATION_MIN_LEN: usize = 10;

/// Run all four checks and average them.
pub fn evaluate(source: &str) -> QualityReport {
    let formatting = check_formatting(source);
    let naming = check_naming(source);
    let commenting = check_commenting(source);
    let duplication = check_duplication(source);
    let score =
        (formatting.score + naming.score + commenting.score + duplication.score) / 4.0;

    QualityReport {
        formatting,
        naming,
        commenting,
        duplication,
        score,
    }
}

/// Indentation consistency, trailing whitespace, blank-line runs.
pub fn check_formatting(source: &str) -> QualityCheck {
    let mut score: f64 = 1.0;
    let mut issues = Vec::new();

    let mut saw_space_indent = false;
    let mut saw_tab_indent = false;
    let mut mixed_on_one_line = false;
    for line in source.lines() {
        let leading: String = line.chars().take_while(|c| c.is_whitespace()).collect();
        if leading.is_empty() {
            continue;
        }
        let has_space = leading.contains(' ');
        let has_tab = leading.contains('\t');
        if has_space && has_tab {
            mixed_on_one_line = true;
        }
        saw_space_indent |= has_space;
        saw_tab_indent |= has_tab;
    }
    if mixed_on_one_line || (saw_space_indent && saw_tab_indent) {
        score -= 0.2;
        issues.push("inconsistent indentation (mixed tabs and spaces)".to_string());
    }

    if source
        .lines()
        .any(|line| line.ends_with(' ') || line.ends_with('\t'))
    {
        score -= 0.1;
        issues.push("trailing whitespace".to_string());
    }

    let mut blank_run = 0usize;
    let mut long_blank_run = false;
    for line in source.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run >= 3 {
                long_blank_run = true;
            }
        } else {
            blank_run = 0;
        }
    }
    if long_blank_run {
        score -= 0.1;
        issues.push("three or more consecutive blank lines".to_string());
    }

    QualityCheck {
        score: score.max(0.0),
        issues,
    }
}

/// Declared identifiers must be camelCase: `^[a-z][a-zA-Z0-9]*$`.
pub fn check_naming(source: &str) -> QualityCheck {
    let mut score: f64 = 1.0;
    let mut issues = Vec::new();

    let mut previous: Option<&str> = None;
    for word in words(source) {
        if let Some(keyword) = previous {
            if DECLARATION_KEYWORDS.contains(&keyword)
                && !DECLARATION_KEYWORDS.contains(&word)
                && !is_camel_case(word)
            {
                score -= 0.1;
                issues.push(format!("identifier \"{word}\" is not camelCase"));
            }
        }
        previous = Some(word);
    }

    QualityCheck {
        score: score.max(0.0),
        issues,
    }
}

fn is_camel_case(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

/// Comment coverage ratio and unresolved task markers.
pub fn check_commenting(source: &str) -> QualityCheck {
    let mut score: f64 = 1.0;
    let mut issues = Vec::new();

    let total = source.lines().count();
    let mut comment_lines = 0usize;
    let mut comment_text = String::new();
    let mut in_block = false;
    for line in source.lines() {
        let trimmed = line.trim();
        if in_block {
            comment_lines += 1;
            comment_text.push_str(trimmed);
            comment_text.push('\n');
            if trimmed.contains("*/") {
                in_block = false;
            }
        } else if trimmed.starts_with("//") {
            comment_lines += 1;
            comment_text.push_str(trimmed);
            comment_text.push('\n');
        } else if trimmed.starts_with("/*") {
            comment_lines += 1;
            comment_text.push_str(trimmed);
            comment_text.push('\n');
            if !trimmed.contains("*/") {
                in_block = true;
            }
        } else if let Some(pos) = line.find("//") {
            // Trailing comment on a code line: not a comment line, but
            // its text still carries task markers.
            comment_text.push_str(&line[pos..]);
            comment_text.push('\n');
        }
    }

    let ratio = if total == 0 {
        0.0
    } else {
        comment_lines as f64 / total as f64
    };
    if ratio < 0.1 {
        score -= 0.3;
        issues.push("too few comments (under 10% of lines)".to_string());
    } else if ratio > 0.4 {
        score -= 0.1;
        issues.push("too many comments (over 40% of lines)".to_string());
    }

    let lowered = comment_text.to_lowercase();
    if ["todo", "fixme", "xxx"]
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        score -= 0.2;
        issues.push("unresolved task markers in comments".to_string());
    }

    QualityCheck {
        score: score.max(0.0),
        issues,
    }
}

/// Repeated non-trivial lines: `0.1 × (N − 1)` off per duplicated
/// line, with the 1-based source positions of every occurrence.
pub fn check_duplication(source: &str) -> QualityCheck {
    let mut score = 1.0;
    let mut issues = Vec::new();

    let mut occurrences: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.chars().count() > DUPLICATION_MIN_LEN {
            let positions = occurrences.entry(trimmed).or_default();
            if positions.is_empty() {
                first_seen.push(trimmed);
            }
            positions.push(index + 1);
        }
    }

    for line in first_seen {
        let positions = &occurrences[line];
        if positions.len() > 1 {
            score -= 0.1 * (positions.len() - 1) as f64;
            let listed: Vec<String> = positions.iter().map(|p| p.to_string()).collect();
            issues.push(format!("line duplicated at lines {}", listed.join(", ")));
        }
    }

    QualityCheck {
        score: score.max(0.0),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_source_scores_full_duplication() {
        let check = check_duplication("const greeting = 1;\nconst farewell = 2;\n");
        assert_eq!(check.score, 1.0);
        assert!(check.issues.is_empty());
    }

    #[test]
    fn duplication_penalty_is_exact() {
        // One 15-character line repeated 4 times: 0.1 × 3 off, all
        // four positions reported.
        let line = "let aaaa = 111;";
        assert_eq!(line.chars().count(), 15);
        let source = format!("{line}\n{line}\n{line}\n{line}\n");
        let check = check_duplication(&source);
        assert!((check.score - 0.7).abs() < 1e-9);
        assert_eq!(check.issues.len(), 1);
        assert!(check.issues[0].contains("1, 2, 3, 4"));
    }

    #[test]
    fn duplication_clamps_at_zero() {
        let line = "let aaaa = 111;";
        let source = format!("{}\n", [line; 20].join("\n"));
        let check = check_duplication(&source);
        assert_eq!(check.score, 0.0);
    }

    #[test]
    fn short_lines_ignored_for_duplication() {
        let source = "return;\nreturn;\nreturn;\n";
        let check = check_duplication(source);
        assert_eq!(check.score, 1.0);
    }

    #[test]
    fn naming_flags_violations() {
        let source = "let GoodDay = 1;\nconst snake_case = 2;\nvar fine = 3;";
        let check = check_naming(source);
        assert!((check.score - 0.8).abs() < 1e-9);
        assert_eq!(check.issues.len(), 2);
        assert!(check.issues[0].contains("GoodDay"));
        assert!(check.issues[1].contains("snake_case"));
    }

    #[test]
    fn naming_accepts_camel_case() {
        let source = "let userName = 1;\nfunction respondToInput() {}";
        let check = check_naming(source);
        assert_eq!(check.score, 1.0);
    }

    #[test]
    fn formatting_flags_mixed_indentation() {
        let source = "function f() {\n\tlet a = 1;\n  let b = 2;\n}";
        let check = check_formatting(source);
        assert!((check.score - 0.8).abs() < 1e-9);
        assert!(check.issues[0].contains("indentation"));
    }

    #[test]
    fn formatting_flags_trailing_and_blank_runs() {
        let source = "let a = 1;  \n\n\n\nlet b = 2;\n";
        let check = check_formatting(source);
        assert!((check.score - 0.8).abs() < 1e-9);
        assert_eq!(check.issues.len(), 2);
    }

    #[test]
    fn commenting_ratio_bounds() {
        // No comments at all: too few.
        let bare = "let a = 1;\nlet b = 2;\nlet c = 3;\nlet d = 4;\nlet e = 5;\n\
                    let f = 6;\nlet g = 7;\nlet h = 8;\nlet i = 9;\nlet j = 10;\n";
        let check = check_commenting(bare);
        assert!((check.score - 0.7).abs() < 1e-9);

        // One comment in ten lines: exactly 10%, no penalty.
        let balanced = format!("// explains the block\n{}", bare.lines().skip(1).collect::<Vec<_>>().join("\n"));
        let check = check_commenting(&balanced);
        assert_eq!(check.score, 1.0);

        // Mostly comments: too many.
        let chatty = "// one\n// two\n// three\nlet a = 1;\n";
        let check = check_commenting(chatty);
        assert!((check.score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn commenting_flags_task_markers() {
        let source = "// ToDo: finish this\nlet a = 1;\nlet b = 2;\nlet c = 3;\n\
                      let d = 4;\nlet e = 5;\nlet f = 6;\nlet g = 7;\nlet h = 8;\nlet i = 9;\n";
        let check = check_commenting(source);
        // Ratio is exactly 10% (fine); only the marker penalty applies.
        assert!((check.score - 0.8).abs() < 1e-9);
        assert!(check.issues[0].contains("task markers"));
    }

    #[test]
    fn mean_of_four_checks() {
        let report = evaluate("");
        // Empty source: only the comment-ratio penalty fires.
        assert!((report.score - 0.925).abs() < 1e-9);
        assert!(report.score >= 0.0 && report.score <= 1.0);
    }
}
