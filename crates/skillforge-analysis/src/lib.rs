//! skillforge-analysis — Text-based static analysis of submissions.
//!
//! Computes structural complexity metrics and code-quality checks from
//! raw source text. Nothing here executes the submission; the analyzer
//! is a pure function of the text and is safe to run on code that does
//! not parse.

use skillforge_core::results::AnalysisReport;
use skillforge_core::traits::StaticAnalyzer;

pub mod metrics;
pub mod quality;

/// The default analyzer: structural metrics plus quality checks.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextAnalyzer;

impl TextAnalyzer {
    pub fn new() -> Self {
        TextAnalyzer
    }
}

impl StaticAnalyzer for TextAnalyzer {
    fn analyze(&self, source: &str) -> AnalysisReport {
        let complexity = metrics::measure(source);
        let quality = quality::evaluate(source);
        tracing::trace!(
            lines = complexity.lines,
            complexity = complexity.score,
            quality = quality.score,
            "analyzed submission"
        );
        AnalysisReport {
            complexity,
            quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
// Respond to a greeting.
function respond(input) {
    if (input === 'hello') {
        return 'Hi!';
    }
    return 'Goodbye!';
}
";

    #[test]
    fn analysis_is_deterministic() {
        let analyzer = TextAnalyzer::new();
        let first = analyzer.analyze(SAMPLE);
        let second = analyzer.analyze(SAMPLE);
        assert_eq!(first.complexity.score, second.complexity.score);
        assert_eq!(first.quality.score, second.quality.score);
        assert_eq!(first.quality.naming.issues, second.quality.naming.issues);
    }

    #[test]
    fn scores_stay_in_unit_range() {
        let analyzer = TextAnalyzer::new();
        for source in ["", SAMPLE, "\t  \n???\n&&||", "if ".repeat(400).as_str()] {
            let report = analyzer.analyze(source);
            assert!(report.complexity.score >= 0.0 && report.complexity.score <= 1.0);
            assert!(report.quality.score >= 0.0 && report.quality.score <= 1.0);
        }
    }

    #[test]
    fn clean_sample_has_no_naming_issues() {
        let report = TextAnalyzer::new().analyze(SAMPLE);
        assert!(report.quality.naming.issues.is_empty());
        assert_eq!(report.complexity.functions, 1);
        assert_eq!(report.complexity.branches, 1);
    }
}
