//! Conversion between JSON payload values and bound statement parameters

use super::ddl::StoreTarget;
use crate::contract::{is_reserved_column, DataType, EngineError, InstanceData, Property};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use sea_orm::Value as DbValue;
use serde_json::Value;
use uuid::Uuid;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Audit timestamp for the current instant, truncated to microseconds
pub fn timestamp_now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

/// Bind an instance or object type id for the target's key layout
pub fn id_value(target: &StoreTarget, id: Uuid) -> DbValue {
    if target.native_ids() {
        id.into()
    } else {
        id.to_string().into()
    }
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Render a stored timestamp in one sortable shape
pub fn canonical_timestamp(raw: &str) -> Option<String> {
    parse_datetime(raw).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string())
}

fn typed_null(data_type: DataType, target: &StoreTarget) -> DbValue {
    let connector = target.connector.as_ref();
    match data_type {
        DataType::String | DataType::Text | DataType::Other => None::<String>.into(),
        DataType::Integer => None::<i32>.into(),
        DataType::Long => None::<i64>.into(),
        DataType::Float | DataType::Double => None::<f64>.into(),
        DataType::Boolean if connector.native_boolean() => None::<bool>.into(),
        DataType::Boolean => None::<i32>.into(),
        DataType::Date => None::<NaiveDate>.into(),
        DataType::Timestamp => None::<NaiveDateTime>.into(),
        DataType::Json if connector.native_json() => None::<Value>.into(),
        DataType::Json => None::<String>.into(),
        DataType::Uuid if connector.native_uuid() => None::<Uuid>.into(),
        DataType::Uuid => None::<String>.into(),
        DataType::Blob => None::<Vec<u8>>.into(),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert a payload value into a parameter for the property's column.
///
/// Runs before any statement executes, so a mismatch never leaves a partial write.
pub fn to_db_value(
    target: &StoreTarget,
    property: &Property,
    value: &Value,
) -> Result<DbValue, EngineError> {
    let data_type = property.data_type;
    if value.is_null() {
        return Ok(typed_null(data_type, target));
    }
    let invalid = || EngineError::InvalidPropertyType {
        property: property.name.clone(),
        expected: data_type,
    };
    let connector = target.connector.as_ref();

    let converted = match data_type {
        DataType::String | DataType::Text | DataType::Other => text_of(value).into(),
        DataType::Integer => {
            let n = match value {
                Value::Number(n) => n.as_i64().ok_or_else(invalid)?,
                Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid())?,
                _ => return Err(invalid()),
            };
            i32::try_from(n).map_err(|_| invalid())?.into()
        }
        DataType::Long => match value {
            Value::Number(n) => n.as_i64().ok_or_else(invalid)?.into(),
            Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid())?.into(),
            _ => return Err(invalid()),
        },
        DataType::Float | DataType::Double => match value {
            Value::Number(n) => n.as_f64().ok_or_else(invalid)?.into(),
            Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid())?.into(),
            _ => return Err(invalid()),
        },
        DataType::Boolean => {
            let flag = match value {
                Value::Bool(b) => *b,
                Value::String(s) if s.eq_ignore_ascii_case("true") => true,
                Value::String(s) if s.eq_ignore_ascii_case("false") => false,
                Value::Number(n) if n.as_i64() == Some(1) => true,
                Value::Number(n) if n.as_i64() == Some(0) => false,
                _ => return Err(invalid()),
            };
            if connector.native_boolean() {
                flag.into()
            } else {
                i32::from(flag).into()
            }
        }
        DataType::Date => {
            let raw = value.as_str().ok_or_else(invalid)?;
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .ok()
                .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
                .ok_or_else(invalid)?
                .into()
        }
        DataType::Timestamp => parse_datetime(value.as_str().ok_or_else(invalid)?)
            .ok_or_else(invalid)?
            .into(),
        DataType::Json => {
            if connector.native_json() {
                value.clone().into()
            } else {
                serde_json::to_string(value)
                    .map_err(|e| EngineError::Internal(e.to_string()))?
                    .into()
            }
        }
        DataType::Uuid => {
            let id = Uuid::parse_str(value.as_str().ok_or_else(invalid)?.trim())
                .map_err(|_| invalid())?;
            if connector.native_uuid() {
                id.into()
            } else {
                id.to_string().into()
            }
        }
        DataType::Blob => match value {
            Value::String(s) => STANDARD.decode(s.trim()).map_err(|_| invalid())?.into(),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .ok_or_else(invalid)?
                .into(),
            _ => return Err(invalid()),
        },
    };
    Ok(converted)
}

fn normalize_value(value: Value, data_type: DataType) -> Value {
    match (data_type, value) {
        (DataType::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(0) => Value::Bool(false),
            Some(1) => Value::Bool(true),
            _ => Value::Number(n),
        },
        (DataType::Boolean, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Value::Bool(true),
            "false" | "f" | "0" => Value::Bool(false),
            _ => Value::String(s),
        },
        (DataType::Integer | DataType::Long, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(s)),
        (DataType::Float | DataType::Double, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(s)),
        (DataType::Json, Value::String(s)) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
        (DataType::Blob, Value::Array(items)) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect();
            match bytes {
                Some(bytes) => Value::String(STANDARD.encode(bytes)),
                None => Value::Array(items),
            }
        }
        (_, value) => value,
    }
}

/// Shape a stored row for callers.
///
/// Column labels are lower-cased, property columns are renamed back to their
/// property names with store encodings undone, audit timestamps get one
/// sortable format, and `class_id` is removed.
pub fn normalize_row(row: InstanceData, properties: &[Property]) -> InstanceData {
    let mut row: InstanceData = row
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect();
    row.remove("class_id");

    for key in ["created_at", "updated_at"] {
        if let Some(Value::String(raw)) = row.get(key) {
            if let Some(canonical) = canonical_timestamp(raw) {
                row.insert(key.to_string(), Value::String(canonical));
            }
        }
    }

    for property in properties {
        let column = property.column_name();
        if is_reserved_column(&column) {
            continue;
        }
        if let Some(value) = row.remove(&column) {
            row.insert(property.name.clone(), normalize_value(value, property.data_type));
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ddl::TableLayout;
    use crate::infra::datasource::dialects::{OracleConnector, PostgresConnector, SqliteConnector};
    use crate::infra::datasource::DialectConnector;
    use serde_json::json;
    use std::sync::Arc;

    fn target(connector: Arc<dyn DialectConnector>, layout: TableLayout) -> StoreTarget {
        StoreTarget {
            label: "test".to_string(),
            connector,
            layout,
            schema: None,
        }
    }

    fn prop(name: &str, data_type: DataType) -> Property {
        Property {
            id: Uuid::new_v4(),
            object_type_id: Uuid::nil(),
            name: name.to_string(),
            data_type,
            required: false,
            default_value: None,
            sort_order: 0,
        }
    }

    #[test]
    fn ids_bind_natively_only_on_the_platform_uuid_store() {
        let id = Uuid::new_v4();
        let pg = target(Arc::new(PostgresConnector), TableLayout::Platform);
        assert_eq!(id_value(&pg, id), DbValue::from(id));

        let external = target(Arc::new(PostgresConnector), TableLayout::External);
        assert_eq!(id_value(&external, id), DbValue::from(id.to_string()));
    }

    #[test]
    fn payload_values_convert_per_type() {
        let t = target(Arc::new(SqliteConnector), TableLayout::External);
        assert_eq!(
            to_db_value(&t, &prop("n", DataType::Integer), &json!("42")).unwrap(),
            DbValue::from(42i32)
        );
        assert_eq!(
            to_db_value(&t, &prop("b", DataType::Boolean), &json!("TRUE")).unwrap(),
            DbValue::from(true)
        );
        assert_eq!(
            to_db_value(&t, &prop("j", DataType::Json), &json!({"a": 1})).unwrap(),
            DbValue::from("{\"a\":1}".to_string())
        );
        assert_eq!(
            to_db_value(&t, &prop("d", DataType::Date), &json!("2024-02-29")).unwrap(),
            DbValue::from(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert!(matches!(
            to_db_value(&t, &prop("n", DataType::Integer), &json!("x")),
            Err(EngineError::InvalidPropertyType { .. })
        ));
        assert!(matches!(
            to_db_value(&t, &prop("n", DataType::Integer), &json!(1u64 << 40)),
            Err(EngineError::InvalidPropertyType { .. })
        ));
    }

    #[test]
    fn dialect_encodings() {
        let oracle = target(Arc::new(OracleConnector), TableLayout::External);
        assert_eq!(
            to_db_value(&oracle, &prop("b", DataType::Boolean), &json!(true)).unwrap(),
            DbValue::from(1i32)
        );
        let pg = target(Arc::new(PostgresConnector), TableLayout::External);
        assert_eq!(
            to_db_value(&pg, &prop("j", DataType::Json), &json!([1])).unwrap(),
            DbValue::from(json!([1]))
        );
    }

    #[test]
    fn timestamps_accept_common_shapes() {
        for raw in [
            "2024-05-01T10:11:12",
            "2024-05-01 10:11:12",
            "2024-05-01T10:11:12Z",
            "2024-05-01T12:11:12+02:00",
        ] {
            assert_eq!(
                canonical_timestamp(raw).as_deref(),
                Some("2024-05-01T10:11:12.000000"),
                "{raw}"
            );
        }
        assert!(canonical_timestamp("yesterday").is_none());
    }

    #[test]
    fn rows_are_renamed_and_decoded() {
        let props = vec![
            prop("FullName", DataType::String),
            prop("active", DataType::Boolean),
            prop("meta", DataType::Json),
        ];
        let row = match json!({
            "ID": "7",
            "class_id": "x",
            "fullname": "Ada",
            "active": 1,
            "meta": "{\"k\":[1,2]}",
            "created_at": "2024-05-01 10:11:12.5"
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let normalized = normalize_row(row, &props);
        assert!(!normalized.contains_key("class_id"));
        assert_eq!(normalized["id"], json!("7"));
        assert_eq!(normalized["FullName"], json!("Ada"));
        assert_eq!(normalized["active"], json!(true));
        assert_eq!(normalized["meta"], json!({"k": [1, 2]}));
        assert_eq!(normalized["created_at"], json!("2024-05-01T10:11:12.500000"));
    }
}
