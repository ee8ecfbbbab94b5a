//! Minimal JSON-schema-like argument validation (spec §4.H).
//!
//! Sufficient to validate presence and scalar type — not a full
//! JSON Schema implementation.

use serde_json::Value;

/// Validates `arguments` against `schema`, an object with `properties`
/// (name → `{"type": "..."}`) and `required` (array of names).
pub fn validate(schema: &Value, arguments: &Value) -> Result<(), String> {
    let Some(schema_obj) = schema.as_object() else { return Ok(()) };

    if let Some(required) = schema_obj.get("required").and_then(Value::as_array) {
        for name in required {
            let Some(name) = name.as_str() else { continue };
            if arguments.get(name).is_none() {
                return Err(format!("missing required argument '{name}'"));
            }
        }
    }

    if let Some(properties) = schema_obj.get("properties").and_then(Value::as_object) {
        for (name, prop_schema) in properties {
            let Some(value) = arguments.get(name) else { continue };
            let Some(expected_type) = prop_schema.get("type").and_then(Value::as_str) else { continue };
            if !matches_type(value, expected_type) {
                return Err(format!("argument '{name}' expected type '{expected_type}'"));
            }
        }
    }

    Ok(())
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "properties": { "project_id": {"type": "string"}, "top_k": {"type": "integer"} },
            "required": ["project_id"],
        })
    }

    #[test]
    fn accepts_valid_arguments() {
        assert!(validate(&schema(), &json!({"project_id": "p1", "top_k": 5})).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        assert!(validate(&schema(), &json!({"top_k": 5})).is_err());
    }

    #[test]
    fn rejects_wrong_scalar_type() {
        assert!(validate(&schema(), &json!({"project_id": 5})).is_err());
    }

    #[test]
    fn schema_without_properties_section_accepts_anything() {
        assert!(validate(&json!({}), &json!({"anything": true})).is_ok());
    }
}
