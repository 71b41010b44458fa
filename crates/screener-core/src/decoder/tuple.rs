//! Decoding of the parenthesized pseudo-tuple format.
//!
//! Expected shape:
//!
//! ```text
//! ("Name", [[4, "why"], [5, "why"], [3, "why"], [4, "why"], [5, "why"]], [82.5], "Summary")
//! ```
//!
//! Every `(` in the reply is tried as the start of a literal, in order,
//! and the first one that parses into this shape wins. Parentheses in the
//! surrounding prose are skipped instead of derailing the search.

use super::literal::{parse_prefix, Literal};
use crate::types::{Criterion, CriterionRating, EvaluationRecord, DEFAULT_CANDIDATE_NAME};

pub(super) fn decode(text: &str) -> Result<EvaluationRecord, String> {
    let mut shape_error: Option<String> = None;
    let mut syntax_error: Option<String> = None;

    for (start, _) in text.match_indices('(') {
        match parse_prefix(&text[start..]) {
            Ok((literal, _)) => match record_from_literal(&literal) {
                Ok(record) => return Ok(record),
                Err(e) => {
                    tracing::trace!(offset = start, error = %e, "Tuple candidate has wrong shape");
                    shape_error.get_or_insert(e);
                }
            },
            Err(e) => {
                syntax_error.get_or_insert(format!("malformed literal at offset {} ({})", start, e));
            }
        }
    }

    Err(shape_error
        .or(syntax_error)
        .unwrap_or_else(|| "no parenthesized group found".to_string()))
}

/// Map a parsed literal onto an [`EvaluationRecord`].
pub(super) fn record_from_literal(literal: &Literal) -> Result<EvaluationRecord, String> {
    let items = match literal {
        Literal::Tuple(items) if items.len() == 4 => items,
        other => return Err(format!("expected a 4-element tuple, found {}", other)),
    };

    let candidate_name = match &items[0] {
        Literal::Str(name) if name.trim().is_empty() => DEFAULT_CANDIDATE_NAME.to_string(),
        Literal::Str(name) => name.trim().to_string(),
        other => return Err(format!("candidate name must be a string, found {}", other)),
    };

    let pairs = items[1]
        .as_sequence()
        .ok_or_else(|| format!("ratings must be a list, found {}", items[1]))?;
    if pairs.len() != Criterion::ALL.len() {
        return Err(format!(
            "expected {} rating pairs, found {}",
            Criterion::ALL.len(),
            pairs.len()
        ));
    }

    let ratings = Criterion::ALL
        .iter()
        .zip(pairs)
        .map(|(criterion, pair)| rating_from_pair(*criterion, pair))
        .collect::<Result<Vec<_>, _>>()?;

    let overall_fit_percentage = percentage(&items[2])?;

    let overall_summary = match &items[3] {
        Literal::Str(summary) => summary.trim().to_string(),
        other => return Err(format!("summary must be a string, found {}", other)),
    };

    Ok(EvaluationRecord {
        candidate_name,
        ratings,
        overall_fit_percentage,
        overall_summary,
    })
}

/// A rating is an integer; `4.0` is accepted as `4`, the same as in JSON replies.
fn rating_from_pair(criterion: Criterion, pair: &Literal) -> Result<CriterionRating, String> {
    let (rating, justification) = match pair.as_sequence() {
        Some([Literal::Int(rating), Literal::Str(justification)]) => {
            let rating = i32::try_from(*rating)
                .map_err(|_| format!("{} rating {} out of bounds", criterion, rating))?;
            (rating, justification)
        }
        Some([Literal::Float(rating), Literal::Str(justification)]) => {
            if rating.fract() != 0.0
                || *rating < f64::from(i32::MIN)
                || *rating > f64::from(i32::MAX)
            {
                return Err(format!("{} rating {} is not an integer", criterion, rating));
            }
            (*rating as i32, justification)
        }
        _ => {
            return Err(format!(
                "{} must be an [integer, string] pair, found {}",
                criterion, pair
            ))
        }
    };

    Ok(CriterionRating {
        criterion,
        rating,
        justification: justification.trim().to_string(),
    })
}

/// The percentage slot: `[82.5]`, `[]`, a bare number, or `None`.
fn percentage(literal: &Literal) -> Result<Option<f64>, String> {
    match literal {
        Literal::None => Ok(None),
        Literal::Int(n) => Ok(Some(*n as f64)),
        Literal::Float(f) => Ok(Some(*f)),
        Literal::List(items) | Literal::Tuple(items) => match items.as_slice() {
            [] | [Literal::None] => Ok(None),
            [Literal::Int(n)] => Ok(Some(*n as f64)),
            [Literal::Float(f)] => Ok(Some(*f)),
            [other] => Err(format!("overall percentage must be numeric, found {}", other)),
            _ => Err(format!(
                "overall percentage must have at most one element, found {}",
                items.len()
            )),
        },
        other => Err(format!("overall percentage must be numeric, found {}", other)),
    }
}
