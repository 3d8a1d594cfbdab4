//! Raw statement execution against a scoped connection
//!
//! Rows are decoded into JSON maps keyed by column label. Every failure is
//! wrapped with the identity of the store it came from.

use crate::contract::{EngineError, InstanceData};
use sea_orm::{ConnectionTrait, DbBackend, FromQueryResult, JsonValue, Statement, Value};

/// Positional parameter marker for the connection's backend (1-based)
pub fn placeholder(backend: DbBackend, index: usize) -> String {
    match backend {
        DbBackend::Postgres => format!("${index}"),
        _ => "?".to_string(),
    }
}

pub async fn query_rows<C>(
    conn: &C,
    store: &str,
    sql: &str,
    values: Vec<Value>,
) -> Result<Vec<InstanceData>, EngineError>
where
    C: ConnectionTrait,
{
    tracing::debug!(store, sql, "query");
    let stmt = Statement::from_sql_and_values(conn.get_database_backend(), sql, values);
    let rows = JsonValue::find_by_statement(stmt)
        .all(conn)
        .await
        .map_err(|e| EngineError::database(store, e))?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match row {
            JsonValue::Object(map) => Some(map),
            _ => None,
        })
        .collect())
}

pub async fn query_one<C>(
    conn: &C,
    store: &str,
    sql: &str,
    values: Vec<Value>,
) -> Result<Option<InstanceData>, EngineError>
where
    C: ConnectionTrait,
{
    Ok(query_rows(conn, store, sql, values).await?.into_iter().next())
}

/// Execute a statement and return the number of affected rows
pub async fn execute<C>(
    conn: &C,
    store: &str,
    sql: &str,
    values: Vec<Value>,
) -> Result<u64, EngineError>
where
    C: ConnectionTrait,
{
    tracing::debug!(store, sql, "execute");
    let stmt = Statement::from_sql_and_values(conn.get_database_backend(), sql, values);
    conn.execute(stmt)
        .await
        .map(|result| result.rows_affected())
        .map_err(|e| EngineError::database(store, e))
}

/// Case-insensitive text field of a decoded row
pub fn row_text(row: &InstanceData, key: &str) -> Option<String> {
    row_field(row, key).and_then(|value| match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Case-insensitive integer field of a decoded row
pub fn row_int(row: &InstanceData, key: &str) -> Option<i64> {
    row_field(row, key).and_then(|value| match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        JsonValue::Bool(b) => Some(i64::from(*b)),
        _ => None,
    })
}

fn row_field<'a>(row: &'a InstanceData, key: &str) -> Option<&'a JsonValue> {
    row.get(key).or_else(|| {
        row.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}
