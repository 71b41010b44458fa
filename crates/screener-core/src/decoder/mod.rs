//! Model response decoding.
//!
//! The model is asked for a specific reply format, but what comes back is
//! free text. Three strategies are tried in order and the first one that
//! yields a complete record wins:
//!
//! 1. [`DecodeStrategy::Json`]: a JSON object validated against the
//!    embedded schema (the format requested by default)
//! 2. [`DecodeStrategy::Tuple`]: a parenthesized tuple literal
//! 3. [`DecodeStrategy::Lines`]: `Label: Rating: N/5, Justification: ...` lines
//!
//! There is no partial salvage. A reply either produces a full
//! [`EvaluationRecord`] or a [`DecodeError`] carrying the raw text.

mod json;
mod lines;
pub mod literal;
mod schema;
mod tuple;

pub use literal::{Literal, LiteralError};
pub use schema::{validate_evaluation_schema, SchemaError, EVALUATION_SCHEMA_JSON};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::{EvaluationRecord, RangeViolation};

/// A reply format the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStrategy {
    Json,
    Tuple,
    Lines,
}

impl DecodeStrategy {
    /// All strategies in the order they are attempted.
    pub const ALL: [DecodeStrategy; 3] =
        [DecodeStrategy::Json, DecodeStrategy::Tuple, DecodeStrategy::Lines];

    fn decode(&self, text: &str) -> Result<EvaluationRecord, String> {
        match self {
            DecodeStrategy::Json => json::decode(text),
            DecodeStrategy::Tuple => tuple::decode(text),
            DecodeStrategy::Lines => lines::decode(text),
        }
    }
}

impl fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeStrategy::Json => write!(f, "json"),
            DecodeStrategy::Tuple => write!(f, "tuple"),
            DecodeStrategy::Lines => write!(f, "lines"),
        }
    }
}

/// Why one strategy rejected the reply.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyFailure {
    pub strategy: DecodeStrategy,
    pub reason: String,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

/// Errors from response decoding.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("No evaluation record found in model response ({})", join_failures(.attempts))]
    NoRecord {
        raw: String,
        attempts: Vec<StrategyFailure>,
    },

    #[error("Evaluation values out of range: {}", join_violations(.violations))]
    OutOfRange {
        raw: String,
        violations: Vec<RangeViolation>,
    },
}

impl DecodeError {
    /// The model reply that could not be decoded.
    pub fn raw(&self) -> &str {
        match self {
            DecodeError::NoRecord { raw, .. } | DecodeError::OutOfRange { raw, .. } => raw,
        }
    }
}

fn join_failures(attempts: &[StrategyFailure]) -> String {
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_violations(violations: &[RangeViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Decoder behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Reject records whose ratings or percentage fall outside their bounds.
    /// When false, violations are logged and the record is kept.
    pub strict_ranges: bool,
}

/// Decode a model reply with default options.
pub fn decode_response(text: &str) -> Result<EvaluationRecord, DecodeError> {
    decode_response_with(text, DecodeOptions::default())
}

/// Decode a model reply.
pub fn decode_response_with(
    text: &str,
    options: DecodeOptions,
) -> Result<EvaluationRecord, DecodeError> {
    let mut attempts = Vec::new();

    for strategy in DecodeStrategy::ALL {
        match strategy.decode(text) {
            Ok(record) => {
                tracing::debug!(strategy = %strategy, candidate = %record.candidate_name, "Decoded model response");
                return check_ranges(record, text, options);
            }
            Err(reason) => attempts.push(StrategyFailure { strategy, reason }),
        }
    }

    Err(DecodeError::NoRecord {
        raw: text.to_string(),
        attempts,
    })
}

fn check_ranges(
    record: EvaluationRecord,
    raw: &str,
    options: DecodeOptions,
) -> Result<EvaluationRecord, DecodeError> {
    let violations = record.range_violations();
    if violations.is_empty() {
        return Ok(record);
    }

    if options.strict_ranges {
        return Err(DecodeError::OutOfRange {
            raw: raw.to_string(),
            violations,
        });
    }

    for v in &violations {
        tracing::warn!(candidate = %record.candidate_name, violation = %v, "Model returned out-of-range value");
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Criterion;
    use proptest::prelude::*;

    const JANE: &str = r#"("Jane Doe", [[4,"ok"],[5,"great"],[3,"meh"],[4,"fine"],[5,"top"]], [82.5], "Strong fit")"#;

    #[test]
    fn test_decode_example_literal() {
        let record = decode_response(JANE).unwrap();
        assert_eq!(record.candidate_name, "Jane Doe");
        assert_eq!(record.ratings.len(), 5);
        assert_eq!(record.ratings[1].criterion, Criterion::SkillsMatch);
        assert_eq!(record.ratings[1].rating, 5);
        assert_eq!(record.ratings[1].justification, "great");
        assert_eq!(record.overall_fit_percentage, Some(82.5));
        assert_eq!(record.overall_summary, "Strong fit");
    }

    #[test]
    fn test_no_parenthesized_group_is_decode_failure() {
        let result = decode_response("Sorry, I can't read this resume.");
        match result {
            Err(DecodeError::NoRecord { raw, attempts }) => {
                assert_eq!(raw, "Sorry, I can't read this resume.");
                assert_eq!(attempts.len(), 3);
            }
            other => panic!("Expected NoRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_fewer_than_five_pairs_is_decode_failure() {
        let text = r#"("Jane Doe", [[4,"ok"],[5,"great"]], [82.5], "Strong fit")"#;
        let err = decode_response(text).unwrap_err();
        assert!(err.to_string().contains("expected 5 rating pairs"));
        assert_eq!(err.raw(), text);
    }

    #[test]
    fn test_json_preferred_over_tuple() {
        let json = serde_json::json!({
            "candidate_name": "From JSON",
            "ratings": Criterion::ALL.iter().map(|c| serde_json::json!({
                "criterion": c.key(), "rating": 3, "justification": "j"
            })).collect::<Vec<_>>(),
            "overall_fit_percentage": 50,
            "overall_summary": "s"
        });
        let text = format!("{}\n{}", JANE, json);
        assert_eq!(decode_response(&text).unwrap().candidate_name, "From JSON");
    }

    #[test]
    fn test_out_of_range_lenient_keeps_record() {
        let text = r#"("Jane", [[7,"a"],[5,"b"],[3,"c"],[4,"d"],[5,"e"]], [120.0], "ok")"#;
        let record = decode_response(text).unwrap();
        assert_eq!(record.ratings[0].rating, 7);
        assert_eq!(record.overall_fit_percentage, Some(120.0));
    }

    #[test]
    fn test_out_of_range_strict_rejects() {
        let text = r#"("Jane", [[7,"a"],[5,"b"],[3,"c"],[4,"d"],[5,"e"]], [82.0], "ok")"#;
        let err = decode_response_with(text, DecodeOptions { strict_ranges: true }).unwrap_err();
        match err {
            DecodeError::OutOfRange { violations, .. } => assert_eq!(violations.len(), 1),
            other => panic!("Expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_error_message_lists_strategies() {
        let msg = decode_response("nothing").unwrap_err().to_string();
        assert!(msg.contains("json:"));
        assert!(msg.contains("tuple:"));
        assert!(msg.contains("lines:"));
    }

    proptest! {
        #[test]
        fn prop_decode_never_panics(text in "\\PC*") {
            let _ = decode_response(&text);
        }

        #[test]
        fn prop_decode_never_panics_on_bracket_soup(text in "[\\[\\](){}\"',0-9a-z .:/%\\\\-]{0,200}") {
            let _ = decode_response(&text);
        }

        #[test]
        fn prop_well_formed_tuple_round_trips(
            name in "[A-Za-z][A-Za-z ]{0,20}[A-Za-z]",
            ratings in proptest::array::uniform5(1i32..=5),
            pct in 0u32..=1000,
        ) {
            let pairs: Vec<String> = ratings.iter().map(|r| format!("[{}, \"why\"]", r)).collect();
            let pct = f64::from(pct) / 10.0;
            let text = format!("Result: (\"{}\", [{}], [{:?}], \"summary\")", name, pairs.join(", "), pct);

            let record = decode_response(&text).unwrap();
            prop_assert_eq!(record.candidate_name, name);
            prop_assert_eq!(record.ratings.iter().map(|r| r.rating).collect::<Vec<_>>(), ratings.to_vec());
            prop_assert_eq!(record.overall_fit_percentage, Some(pct));
        }
    }
}
