//! Instance payload validation against property definitions

use crate::contract::{DataType, EngineError, InstanceData, Property};
use serde_json::Value;

/// Find a payload entry for a property name.
///
/// Tries the exact name, then the lower-cased name, then a case-insensitive scan
/// of the payload keys (first match wins). Returns the matched key with its value.
pub fn lookup<'a>(payload: &'a InstanceData, name: &str) -> Option<(&'a str, &'a Value)> {
    if let Some((key, value)) = payload.get_key_value(name) {
        return Some((key.as_str(), value));
    }
    let lower = name.to_lowercase();
    if let Some((key, value)) = payload.get_key_value(&lower) {
        return Some((key.as_str(), value));
    }
    let found = payload
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(key, value)| (key.as_str(), value));
    if let Some((key, _)) = found {
        tracing::debug!(property = name, key, "matched payload key case-insensitively");
    }
    found
}

/// Like [`lookup`], but an explicit JSON `null` counts as absent
pub fn lookup_present<'a>(payload: &'a InstanceData, name: &str) -> Option<&'a Value> {
    lookup(payload, name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_null())
}

/// Validate an instance payload.
///
/// Required properties must carry a non-null, non-blank value. Present values
/// must conform to the declared data type. Types without a rule pass through.
pub fn validate_instance(payload: &InstanceData, properties: &[Property]) -> Result<(), EngineError> {
    for property in properties {
        let value = lookup_present(payload, &property.name);

        if property.required {
            let missing = match value {
                None => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            };
            if missing {
                return Err(EngineError::MissingRequiredField {
                    property: property.name.clone(),
                });
            }
        }

        if let Some(value) = value {
            check_type(value, property)?;
        }
    }
    Ok(())
}

/// Validate an update payload: only properties the payload mentions are checked.
///
/// An explicit `null` clears an optional property and is rejected for a required one.
pub fn validate_partial(payload: &InstanceData, properties: &[Property]) -> Result<(), EngineError> {
    for property in properties {
        let Some((_, value)) = lookup(payload, &property.name) else {
            continue;
        };
        let blank = match value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        };
        if property.required && blank {
            return Err(EngineError::MissingRequiredField {
                property: property.name.clone(),
            });
        }
        if !value.is_null() {
            check_type(value, property)?;
        }
    }
    Ok(())
}

fn check_type(value: &Value, property: &Property) -> Result<(), EngineError> {
    let ok = match property.data_type {
        DataType::String => value.is_string(),
        DataType::Integer => match value {
            Value::Number(n) => n.as_i64().is_some_and(|v| i32::try_from(v).is_ok()),
            other => scalar_text(other).is_some_and(|s| s.trim().parse::<i32>().is_ok()),
        },
        DataType::Float => match value {
            Value::Number(_) => true,
            other => scalar_text(other).is_some_and(|s| s.trim().parse::<f64>().is_ok()),
        },
        DataType::Boolean => match value {
            Value::Bool(_) => true,
            other => scalar_text(other)
                .is_some_and(|s| s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false")),
        },
        DataType::Json => value.is_object() || value.is_array(),
        _ => true,
    };

    if ok {
        Ok(())
    } else {
        Err(EngineError::InvalidPropertyType {
            property: property.name.clone(),
            expected: property.data_type,
        })
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn prop(name: &str, data_type: DataType, required: bool) -> Property {
        Property {
            id: Uuid::new_v4(),
            object_type_id: Uuid::nil(),
            name: name.to_string(),
            data_type,
            required,
            default_value: None,
            sort_order: 0,
        }
    }

    fn payload(value: Value) -> InstanceData {
        match value {
            Value::Object(map) => map,
            _ => InstanceData::new(),
        }
    }

    #[test]
    fn lookup_prefers_exact_then_lower_then_scan() {
        let data = payload(json!({"FullName": "a", "fullname": "b"}));
        assert_eq!(lookup(&data, "FullName").map(|(k, _)| k), Some("FullName"));
        assert_eq!(lookup(&data, "FULLNAME").map(|(k, _)| k), Some("fullname"));

        let data = payload(json!({"FullName": "a"}));
        assert_eq!(lookup(&data, "fullNAME").map(|(k, _)| k), Some("FullName"));
        assert!(lookup(&data, "other").is_none());
    }

    #[test]
    fn required_property_missing_or_blank_fails() {
        let props = vec![prop("name", DataType::String, true)];

        let err = validate_instance(&InstanceData::new(), &props).unwrap_err();
        assert!(matches!(err, EngineError::MissingRequiredField { ref property } if property == "name"));

        let err = validate_instance(&payload(json!({"name": "   "})), &props).unwrap_err();
        assert!(matches!(err, EngineError::MissingRequiredField { .. }));

        let err = validate_instance(&payload(json!({"name": null})), &props).unwrap_err();
        assert!(matches!(err, EngineError::MissingRequiredField { .. }));
    }

    #[test]
    fn required_property_satisfied_in_any_case() {
        let props = vec![prop("name", DataType::String, true)];
        assert!(validate_instance(&payload(json!({"NAME": "x"})), &props).is_ok());
        assert!(validate_instance(&payload(json!({"Name": "x"})), &props).is_ok());
    }

    #[test]
    fn type_rules() {
        let cases = [
            (DataType::String, json!("x"), true),
            (DataType::String, json!(1), false),
            (DataType::Integer, json!(42), true),
            (DataType::Integer, json!("42"), true),
            (DataType::Integer, json!(1.5), false),
            (DataType::Integer, json!("abc"), false),
            (DataType::Float, json!(1.5), true),
            (DataType::Float, json!("2.25"), true),
            (DataType::Float, json!("x"), false),
            (DataType::Boolean, json!(true), true),
            (DataType::Boolean, json!("FALSE"), true),
            (DataType::Boolean, json!("yes"), false),
            (DataType::Json, json!({"a": 1}), true),
            (DataType::Json, json!([1, 2]), true),
            (DataType::Json, json!("{}"), false),
            (DataType::Date, json!(17), true),
            (DataType::Other, json!({"free": "form"}), true),
        ];
        for (data_type, value, valid) in cases {
            let props = vec![prop("field", data_type, false)];
            let result = validate_instance(&payload(json!({ "field": value })), &props);
            assert_eq!(result.is_ok(), valid, "{data_type} with {value}");
            if !valid {
                assert!(matches!(
                    result,
                    Err(EngineError::InvalidPropertyType { expected, .. }) if expected == data_type
                ));
            }
        }
    }

    #[test]
    fn integer_range_is_the_same_for_numbers_and_text() {
        let props = vec![prop("count", DataType::Integer, false)];
        for value in [json!(i32::MAX), json!(i32::MIN), json!("2147483647")] {
            assert!(validate_instance(&payload(json!({ "count": value })), &props).is_ok(), "{value}");
        }
        for value in [json!(3_000_000_000u64), json!(-3_000_000_000i64), json!("3000000000")] {
            assert!(matches!(
                validate_instance(&payload(json!({ "count": value })), &props),
                Err(EngineError::InvalidPropertyType { .. })
            ), "{value}");
        }
    }

    #[test]
    fn optional_null_is_not_type_checked() {
        let props = vec![prop("age", DataType::Integer, false)];
        assert!(validate_instance(&payload(json!({"age": null})), &props).is_ok());
    }

    #[test]
    fn partial_validation_checks_only_mentioned_properties() {
        let props = vec![
            prop("name", DataType::String, true),
            prop("age", DataType::Integer, false),
        ];
        assert!(validate_partial(&payload(json!({"age": 3})), &props).is_ok());
        assert!(validate_partial(&payload(json!({"AGE": null})), &props).is_ok());
        assert!(matches!(
            validate_partial(&payload(json!({"name": null})), &props),
            Err(EngineError::MissingRequiredField { .. })
        ));
        assert!(matches!(
            validate_partial(&payload(json!({"age": "old"})), &props),
            Err(EngineError::InvalidPropertyType { .. })
        ));
    }
}
