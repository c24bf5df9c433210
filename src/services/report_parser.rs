use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ParseError {
    #[error("malformed criterion line: {line}")]
    CriterionLine { line: String },
    #[error("malformed grade line: {line}")]
    GradeLine { line: String },
}

/// One gradable dimension extracted from the model's report. Score values
/// stay textual; callers decide when and how to parse them numerically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct CriterionScore {
    pub(crate) criteria: String,
    pub(crate) scored: String,
    pub(crate) total: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedReport {
    pub(crate) criteria: Vec<CriterionScore>,
    pub(crate) percentage_grade: Option<f64>,
    pub(crate) letter_grade: Option<String>,
}

/// Scans the grading model's free-text report line by line.
///
/// A criterion line is any trimmed line starting with the bullet character
/// and containing a slash; the grammar is `• name: scored/total` with an
/// optional `- comment` tail, where the name may itself contain colons. A
/// bullet line that fails the grammar is a hard [`ParseError`], never a
/// silent drop. Summary lines are recognized by the literal substrings
/// `Total Percentage Grade` and `Letter Grade`; both take their value from
/// the text after the first colon, which keeps the two extractions
/// symmetric.
pub(crate) fn parse_report(output: &str) -> Result<ParsedReport, ParseError> {
    let mut report = ParsedReport::default();

    for raw_line in output.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line.contains("Total Percentage Grade") {
            report.percentage_grade = Some(parse_percentage_line(line)?);
            continue;
        }

        if line.contains("Letter Grade") {
            report.letter_grade = Some(parse_letter_line(line)?);
            continue;
        }

        if line.contains("Feedback") {
            continue;
        }

        if line.starts_with('•') && line.contains('/') {
            report.criteria.push(parse_criterion_line(line)?);
        }
    }

    Ok(report)
}

fn criterion_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^•\s*(?P<name>.+?)\s*:\s*(?P<scored>\d+(?:\.\d+)?)\s*/\s*(?P<total>\d+(?:\.\d+)?)\s*(?:-\s*.*)?$",
        )
        .expect("criterion regex is valid")
    })
}

fn parse_criterion_line(line: &str) -> Result<CriterionScore, ParseError> {
    let captures = criterion_regex()
        .captures(line)
        .ok_or_else(|| ParseError::CriterionLine { line: line.to_string() })?;

    Ok(CriterionScore {
        criteria: captures["name"].trim().to_string(),
        scored: captures["scored"].to_string(),
        total: captures["total"].to_string(),
    })
}

fn parse_percentage_line(line: &str) -> Result<f64, ParseError> {
    let (_, value) = line
        .split_once(':')
        .ok_or_else(|| ParseError::GradeLine { line: line.to_string() })?;

    value
        .replace(['%', '*'], "")
        .trim()
        .parse::<f64>()
        .map_err(|_| ParseError::GradeLine { line: line.to_string() })
}

fn parse_letter_line(line: &str) -> Result<String, ParseError> {
    let (_, value) = line
        .split_once(':')
        .ok_or_else(|| ParseError::GradeLine { line: line.to_string() })?;

    let letter = value.replace('*', "").trim().to_string();
    if letter.is_empty() {
        return Err(ParseError::GradeLine { line: line.to_string() });
    }

    Ok(letter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_report() {
        let output = "• Thesis: 8/10 - good\nTotal Percentage Grade: 85%\nLetter Grade: B";
        let report = parse_report(output).expect("report");

        assert_eq!(
            report.criteria,
            vec![CriterionScore {
                criteria: "Thesis".to_string(),
                scored: "8".to_string(),
                total: "10".to_string(),
            }]
        );
        assert_eq!(report.percentage_grade, Some(85.0));
        assert_eq!(report.letter_grade.as_deref(), Some("B"));
    }

    #[test]
    fn criterion_without_comment_parses() {
        let report = parse_report("• Grammar and Style: 5/5").expect("report");
        assert_eq!(report.criteria[0].criteria, "Grammar and Style");
        assert_eq!(report.criteria[0].scored, "5");
        assert_eq!(report.criteria[0].total, "5");
    }

    #[test]
    fn criterion_name_may_contain_a_colon() {
        let report = parse_report("• Analysis: Depth: 4/5 - thin in places").expect("report");
        assert_eq!(report.criteria[0].criteria, "Analysis: Depth");
        assert_eq!(report.criteria[0].scored, "4");
        assert_eq!(report.criteria[0].total, "5");
    }

    #[test]
    fn malformed_bullet_line_fails_loudly() {
        let result = parse_report("• Thesis 8/10 without a colon");
        assert!(matches!(result, Err(ParseError::CriterionLine { .. })));
    }

    #[test]
    fn non_numeric_score_fails_loudly() {
        let result = parse_report("• Thesis: A/10");
        assert!(matches!(result, Err(ParseError::CriterionLine { .. })));
    }

    #[test]
    fn bullet_without_slash_is_not_a_criterion() {
        let report = parse_report("• Overall impression was positive").expect("report");
        assert!(report.criteria.is_empty());
    }

    #[test]
    fn comment_lines_between_bullets_are_skipped() {
        let output = "• Thesis: 8/10 - good\n  The argument is clearly stated.\n• Evidence: 7/10";
        let report = parse_report(output).expect("report");
        assert_eq!(report.criteria.len(), 2);
        assert_eq!(report.criteria[1].criteria, "Evidence");
    }

    #[test]
    fn percentage_line_tolerates_markdown_emphasis() {
        let report = parse_report("**Total Percentage Grade: 92.5%**").expect("report");
        assert_eq!(report.percentage_grade, Some(92.5));
    }

    #[test]
    fn letter_grade_uses_the_same_split_as_percentage() {
        let report = parse_report("Letter Grade: *B+*").expect("report");
        assert_eq!(report.letter_grade.as_deref(), Some("B+"));
    }

    #[test]
    fn unparseable_percentage_fails_loudly() {
        let result = parse_report("Total Percentage Grade: excellent");
        assert!(matches!(result, Err(ParseError::GradeLine { .. })));
    }

    #[test]
    fn missing_summary_lines_yield_none() {
        let report = parse_report("• Thesis: 8/10").expect("report");
        assert_eq!(report.percentage_grade, None);
        assert_eq!(report.letter_grade, None);
    }

    #[test]
    fn feedback_lines_are_ignored() {
        let report = parse_report("Feedback: keep refining topic sentences").expect("report");
        assert!(report.criteria.is_empty());
        assert_eq!(report.letter_grade, None);
    }
}
