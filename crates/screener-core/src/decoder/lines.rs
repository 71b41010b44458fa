//! Decoding of the line-oriented rating format.
//!
//! ```text
//! 1. Years of Experience: Rating: 4/5, Justification: Good experience in related field.
//! 2. Skills Match: Rating: 5/5, Justification: Excellent alignment with required skills.
//! ...
//! Overall Fit Percentage: 85%
//! ```
//!
//! This format carries no candidate name or summary.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

use crate::types::{Criterion, CriterionRating, EvaluationRecord, DEFAULT_CANDIDATE_NAME};

lazy_static! {
    /// `Rating: 4/5` (markdown emphasis tolerated)
    static ref RATING: Regex = Regex::new(
        r"(?i)\**rating\**\s*:\s*\**\s*(-?\d+)\s*(?:/\s*5)?\**"
    ).unwrap();

    /// `Justification: ...` up to end of line
    static ref JUSTIFICATION: Regex = Regex::new(
        r"(?i)\**justification\**\s*:\s*\**\s*(.*)$"
    ).unwrap();

    /// `Overall Fit Percentage: 85%`
    static ref OVERALL: Regex = Regex::new(
        r"(?i)overall\s+fit\s+percentage\**\s*:\s*\**\s*(\S*)"
    ).unwrap();

    /// Leading list markers: `1.`, `2)`, `-`, `*`
    static ref LIST_MARKER: Regex = Regex::new(
        r"^\s*(?:[-*]\s+)?(?:\d+[.)]\s*)?"
    ).unwrap();
}

/// Placeholder for a rating line without a justification.
const MISSING_JUSTIFICATION: &str = "N/A";

pub(super) fn decode(text: &str) -> Result<EvaluationRecord, String> {
    let mut ratings: BTreeMap<Criterion, CriterionRating> = BTreeMap::new();
    let mut overall_fit_percentage = None;

    for line in text.lines() {
        if let Some(caps) = OVERALL.captures(line) {
            let value = caps[1].trim_matches(|c: char| c == '%' || c == '*');
            overall_fit_percentage = value.parse::<f64>().ok();
            if overall_fit_percentage.is_none() {
                tracing::debug!(line, "Could not parse overall fit percentage");
            }
            continue;
        }

        let Some(rating_match) = RATING.captures(line) else {
            continue;
        };
        let whole = rating_match.get(0).map(|m| (m.start(), m.end())).unwrap_or_default();

        let label = LIST_MARKER.replace(&line[..whole.0], "");
        let label = label.trim_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '*' | '-' | ','));
        let Some(criterion) = Criterion::from_label(label) else {
            tracing::debug!(label, "Skipping rating line for unknown criterion");
            continue;
        };

        let Ok(rating) = rating_match[1].parse::<i32>() else {
            tracing::debug!(line, "Could not parse rating value");
            continue;
        };

        let justification = JUSTIFICATION
            .captures(&line[whole.1..])
            .map(|c| c[1].trim().to_string())
            .filter(|j| !j.is_empty())
            .unwrap_or_else(|| MISSING_JUSTIFICATION.to_string());

        ratings.entry(criterion).or_insert(CriterionRating {
            criterion,
            rating,
            justification,
        });
    }

    let missing: Vec<&str> = Criterion::ALL
        .iter()
        .filter(|c| !ratings.contains_key(c))
        .map(|c| c.label())
        .collect();
    if !missing.is_empty() {
        return Err(format!("missing rating lines for: {}", missing.join(", ")));
    }

    Ok(EvaluationRecord {
        candidate_name: DEFAULT_CANDIDATE_NAME.to_string(),
        ratings: Criterion::ALL
            .iter()
            .filter_map(|c| ratings.remove(c))
            .collect(),
        overall_fit_percentage,
        overall_summary: String::new(),
    })
}
