//! Validation and parsing of scoring service responses.
//!
//! The baseline rule: a response is accepted iff every non-empty line contains
//! `": "`. Strict mode layers a score-format check on top and can only reject
//! more, never accept more.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ResponseError;

pub const SEPARATOR: &str = ": ";

/// One `word: score` line. The score is kept exactly as the service wrote it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorePair {
    pub word: String,
    pub raw_score: String,
}

fn score_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)\s*%?$").expect("score pattern is a valid regex")
    })
}

pub fn is_well_formed(text: &str) -> bool {
    text.lines()
        .filter(|line| !line.is_empty())
        .all(|line| line.contains(SEPARATOR))
}

/// Parses a response into score pairs, rejecting it in full on the first bad line.
///
/// Each line is split once, on the first separator, so a score that itself
/// contains `": "` stays intact.
pub fn parse_response(text: &str, strict: bool) -> Result<Vec<ScorePair>, ResponseError> {
    let mut pairs = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let line_no = idx + 1;

        let (word, raw_score) =
            line.split_once(SEPARATOR)
                .ok_or_else(|| ResponseError::MissingSeparator {
                    line_no,
                    line: line.to_string(),
                })?;

        if strict {
            if word.trim().is_empty() {
                return Err(ResponseError::EmptyWord { line_no, line: line.to_string() });
            }
            if !score_pattern().is_match(raw_score.trim()) {
                return Err(ResponseError::BadScore { line_no, line: line.to_string() });
            }
        }

        pairs.push(ScorePair {
            word: word.to_string(),
            raw_score: raw_score.to_string(),
        });
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_when_every_line_has_separator() {
        assert!(is_well_formed("cat: 80%\ndog: -20%"));
        assert!(is_well_formed("cat: 80%\n\ndog: -20%\n"));
        assert!(is_well_formed(""));
    }

    #[test]
    fn one_bad_line_rejects_everything() {
        let text = "cat: 80%\nbadline";
        assert!(!is_well_formed(text));
        assert_eq!(
            parse_response(text, false),
            Err(ResponseError::MissingSeparator { line_no: 2, line: "badline".into() })
        );
    }

    #[test]
    fn colon_without_space_is_not_a_separator() {
        assert!(!is_well_formed("cat:80%"));
    }

    #[test]
    fn whitespace_only_line_counts_as_non_empty() {
        assert!(!is_well_formed("cat: 80%\n   \ndog: 10%"));
    }

    #[test]
    fn parses_pairs_in_line_order() {
        let pairs = parse_response("cat: 80%\n\ndog: -20%\n", false).unwrap();
        assert_eq!(
            pairs,
            vec![
                ScorePair { word: "cat".into(), raw_score: "80%".into() },
                ScorePair { word: "dog".into(), raw_score: "-20%".into() },
            ]
        );
    }

    #[test]
    fn splits_once_on_the_first_separator() {
        let pairs = parse_response("ratio: 1: 2", false).unwrap();
        assert_eq!(pairs[0].word, "ratio");
        assert_eq!(pairs[0].raw_score, "1: 2");
    }

    #[test]
    fn lenient_mode_keeps_unparseable_scores() {
        let pairs = parse_response("cat: high", false).unwrap();
        assert_eq!(pairs[0].raw_score, "high");
    }

    #[test]
    fn strict_mode_rejects_non_numeric_scores() {
        assert_eq!(
            parse_response("cat: 80%\ndog: high", true),
            Err(ResponseError::BadScore { line_no: 2, line: "dog: high".into() })
        );
        assert!(matches!(
            parse_response(": 80%", true),
            Err(ResponseError::EmptyWord { line_no: 1, .. })
        ));
    }

    #[test]
    fn strict_mode_accepts_common_score_shapes() {
        let text = "a: 80%\nb: -40%\nc: 0\nd: 12.5 %\ne: +3%";
        assert_eq!(parse_response(text, true).unwrap().len(), 5);
    }

    #[test]
    fn strict_mode_never_accepts_what_baseline_rejects() {
        let text = "cat: 80%\nbadline";
        assert!(parse_response(text, true).is_err());
    }
}
