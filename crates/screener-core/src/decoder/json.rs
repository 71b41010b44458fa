//! Decoding of the JSON response format.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::schema::validate_evaluation_schema;
use crate::types::{Criterion, CriterionRating, EvaluationRecord, DEFAULT_CANDIDATE_NAME};

#[derive(Debug, Deserialize)]
struct RawEvaluation {
    #[serde(default)]
    candidate_name: Option<String>,
    ratings: Vec<RawRating>,
    #[serde(default)]
    overall_fit_percentage: Option<f64>,
    #[serde(default)]
    overall_summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRating {
    criterion: String,
    // Integral per the schema; JSON may still spell it `4.0`
    rating: f64,
    justification: String,
}

pub(super) fn decode(text: &str) -> Result<EvaluationRecord, String> {
    let value = find_evaluation_object(text)
        .ok_or_else(|| "no JSON object with a \"ratings\" field found".to_string())?;

    validate_evaluation_schema(&value)
        .map_err(|errors| format!("schema violations: {}", errors.join("; ")))?;

    let raw: RawEvaluation = serde_json::from_value(value).map_err(|e| e.to_string())?;
    into_record(raw)
}

/// First JSON object in `text` that carries a `ratings` field.
///
/// Each `{` is tried as the start of a value; trailing prose after the
/// object (or a closing code fence) is ignored.
fn find_evaluation_object(text: &str) -> Option<JsonValue> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<JsonValue>();
        match stream.next() {
            Some(Ok(value)) if value.get("ratings").is_some() => Some(value),
            _ => None,
        }
    })
}

fn into_record(raw: RawEvaluation) -> Result<EvaluationRecord, String> {
    let mut by_criterion: BTreeMap<Criterion, CriterionRating> = BTreeMap::new();

    for entry in raw.ratings {
        let criterion = Criterion::from_label(&entry.criterion)
            .ok_or_else(|| format!("unknown criterion '{}'", entry.criterion))?;

        if entry.rating.fract() != 0.0
            || entry.rating < f64::from(i32::MIN)
            || entry.rating > f64::from(i32::MAX)
        {
            return Err(format!("{} rating {} is not an integer", criterion, entry.rating));
        }

        let rating = CriterionRating {
            criterion,
            rating: entry.rating as i32,
            justification: entry.justification.trim().to_string(),
        };
        if by_criterion.insert(criterion, rating).is_some() {
            return Err(format!("criterion '{}' rated more than once", criterion.key()));
        }
    }

    // Five entries, no duplicates: every criterion is present.
    let ratings = Criterion::ALL
        .iter()
        .filter_map(|c| by_criterion.remove(c))
        .collect();

    let candidate_name = raw
        .candidate_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_CANDIDATE_NAME.to_string());

    Ok(EvaluationRecord {
        candidate_name,
        ratings,
        overall_fit_percentage: raw.overall_fit_percentage,
        overall_summary: raw.overall_summary.unwrap_or_default().trim().to_string(),
    })
}
