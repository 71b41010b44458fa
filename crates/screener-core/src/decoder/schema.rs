//! JSON Schema validation for model responses.
//!
//! JSON replies are validated against `schema/evaluation.schema.json`
//! before deserialization, so structural problems are reported per field
//! instead of as a single serde error.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded evaluation schema (loaded at compile time).
pub const EVALUATION_SCHEMA_JSON: &str = include_str!("../../schema/evaluation.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = match serde_json::from_str(EVALUATION_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(SchemaError::LoadError(e.clone())),
    }
}

/// Validate a response JSON value against the evaluation schema.
///
/// Returns every violation as "`message` at `path`".
pub fn validate_evaluation_schema(value: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(n: usize) -> serde_json::Value {
        serde_json::Value::Array(
            (0..n)
                .map(|i| {
                    serde_json::json!({
                        "criterion": format!("c{}", i),
                        "rating": 3,
                        "justification": "ok"
                    })
                })
                .collect(),
        )
    }

    #[test]
    fn test_valid_response_passes() {
        let value = serde_json::json!({
            "candidate_name": "Jane Doe",
            "ratings": ratings(5),
            "overall_fit_percentage": 82.5,
            "overall_summary": "Strong fit"
        });
        assert!(validate_evaluation_schema(&value).is_ok());
    }

    #[test]
    fn test_null_optional_fields_pass() {
        let value = serde_json::json!({
            "candidate_name": null,
            "ratings": ratings(5),
            "overall_fit_percentage": null
        });
        assert!(validate_evaluation_schema(&value).is_ok());
    }

    #[test]
    fn test_wrong_rating_count_fails() {
        let value = serde_json::json!({ "ratings": ratings(4) });
        assert!(validate_evaluation_schema(&value).is_err());

        let value = serde_json::json!({ "ratings": ratings(6) });
        assert!(validate_evaluation_schema(&value).is_err());
    }

    #[test]
    fn test_fractional_rating_fails_with_path() {
        let mut value = serde_json::json!({ "ratings": ratings(5) });
        value["ratings"][2]["rating"] = serde_json::json!(3.5);

        let errors = validate_evaluation_schema(&value).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("/ratings/2/rating")));
    }

    #[test]
    fn test_string_percentage_fails() {
        let value = serde_json::json!({
            "ratings": ratings(5),
            "overall_fit_percentage": "85%"
        });
        assert!(validate_evaluation_schema(&value).is_err());
    }
}
