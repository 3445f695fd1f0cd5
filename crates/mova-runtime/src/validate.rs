use mova_core::{EngineError, Result};
use serde_json::Value;

/// Gates the initial parameter map against the plan's declared JSON Schema.
/// All violations are collected (not just the first) and the whole
/// invocation is rejected before any action runs.
pub fn validate_parameters(schema: &Value, params: &Value) -> Result<()> {
    let validator = jsonschema::validator_for(schema).map_err(|e| {
        EngineError::ParameterValidation {
            violations: vec![format!("invalid parameters schema: {e}")],
        }
    })?;

    let violations: Vec<String> = validator
        .iter_errors(params)
        .map(|e| format!("{}: {}", e.instance_path, e))
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(EngineError::ParameterValidation { violations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "count": { "type": "integer", "minimum": 0 }
            }
        })
    }

    #[test]
    fn test_valid_parameters_pass() {
        assert!(validate_parameters(&schema(), &json!({ "name": "x", "count": 3 })).is_ok());
    }

    #[test]
    fn test_missing_required_field_fails() {
        let err = validate_parameters(&schema(), &json!({ "count": 3 })).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_all_violations_reported() {
        let err = validate_parameters(&schema(), &json!({ "count": -1 })).unwrap_err();
        match err {
            EngineError::ParameterValidation { violations } => {
                assert_eq!(violations.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_schema_is_an_error() {
        let bad = json!({ "type": "not-a-type" });
        assert!(validate_parameters(&bad, &json!({})).is_err());
    }
}
