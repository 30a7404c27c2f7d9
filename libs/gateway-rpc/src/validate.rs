//! Lightweight JSON-schema-style argument validation (spec §4.7 step 2):
//! required-field presence and primitive type checks, run before a call
//! reaches `gateway-core`. Not a general JSON Schema engine — the tool
//! catalog only ever emits `object` schemas with `string`/`integer`/
//! `number`/`boolean`/`array` properties and an `enum` constraint.

use gateway_errors::GatewayError;
use serde_json::Value;

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

/// Validates `args` against a tool's argument schema, returning a
/// [`GatewayError::ParameterError`] naming the first violation found.
pub fn validate_arguments(schema: &Value, args: &Value) -> Result<(), GatewayError> {
    let args = if args.is_null() {
        &Value::Object(Default::default())
    } else {
        args
    };
    let args_obj = args
        .as_object()
        .ok_or_else(|| GatewayError::ParameterError("arguments must be a JSON object".to_string()))?;

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required {
            let Some(name) = field.as_str() else { continue };
            if !args_obj.contains_key(name) {
                return Err(GatewayError::ParameterError(format!(
                    "missing required argument '{name}'"
                )));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, prop_schema) in properties {
            let Some(value) = args_obj.get(name) else {
                continue;
            };
            if let Some(expected_type) = prop_schema.get("type").and_then(Value::as_str) {
                if !type_matches(expected_type, value) {
                    return Err(GatewayError::ParameterError(format!(
                        "argument '{name}' must be of type {expected_type}"
                    )));
                }
            }
            if let Some(allowed) = prop_schema.get("enum").and_then(Value::as_array) {
                if !allowed.contains(value) {
                    return Err(GatewayError::ParameterError(format!(
                        "argument '{name}' must be one of {allowed:?}"
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "action": {"type": "string", "enum": ["begin", "commit"]},
            },
            "required": ["query"],
        })
    }

    #[test]
    fn accepts_valid_arguments() {
        assert!(validate_arguments(&schema(), &json!({"query": "SELECT 1"})).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = validate_arguments(&schema(), &json!({})).unwrap_err();
        assert!(matches!(err, GatewayError::ParameterError(_)));
    }

    #[test]
    fn rejects_wrong_type() {
        let err = validate_arguments(&schema(), &json!({"query": 5})).unwrap_err();
        assert!(matches!(err, GatewayError::ParameterError(_)));
    }

    #[test]
    fn rejects_value_outside_enum() {
        let args = json!({"query": "x", "action": "frobnicate"});
        let err = validate_arguments(&schema(), &args).unwrap_err();
        assert!(matches!(err, GatewayError::ParameterError(_)));
    }

    #[test]
    fn null_arguments_treated_as_empty_object() {
        let schema = json!({"type": "object", "properties": {}, "required": []});
        assert!(validate_arguments(&schema, &Value::Null).is_ok());
    }
}
