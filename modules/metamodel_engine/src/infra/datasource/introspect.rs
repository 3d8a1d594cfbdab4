//! Catalog introspection over a live connection

use super::connector::DialectConnector;
use super::sql::{query_rows, row_int, row_text};
use crate::contract::{EngineError, TableColumnInfo};
use sea_orm::ConnectionTrait;
use std::collections::HashSet;

/// Whether a base table exists in the dialect-normalized schema/catalog
pub async fn table_exists<C: ConnectionTrait>(
    conn: &C,
    connector: &dyn DialectConnector,
    store: &str,
    schema: Option<&str>,
    table: &str,
) -> Result<bool, EngineError> {
    let sql = connector.table_exists_query(schema, table);
    Ok(!query_rows(conn, store, &sql, vec![]).await?.is_empty())
}

/// Tables and views
pub async fn list_tables<C: ConnectionTrait>(
    conn: &C,
    connector: &dyn DialectConnector,
    store: &str,
    schema: Option<&str>,
) -> Result<Vec<String>, EngineError> {
    let sql = connector.tables_query(schema, true);
    Ok(query_rows(conn, store, &sql, vec![])
        .await?
        .iter()
        .filter_map(|row| row_text(row, "table_name"))
        .collect())
}

/// Column metadata with primary-key flags
pub async fn list_columns<C: ConnectionTrait>(
    conn: &C,
    connector: &dyn DialectConnector,
    store: &str,
    schema: Option<&str>,
    table: &str,
) -> Result<Vec<TableColumnInfo>, EngineError> {
    let pk_sql = connector.primary_keys_query(schema, table);
    let primary_keys: HashSet<String> = query_rows(conn, store, &pk_sql, vec![])
        .await?
        .iter()
        .filter_map(|row| row_text(row, "column_name"))
        .collect();

    let sql = connector.columns_query(schema, table);
    let rows = query_rows(conn, store, &sql, vec![]).await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            let column_name = row_text(row, "column_name")?;
            Some(TableColumnInfo {
                primary_key: primary_keys.contains(&column_name),
                data_type: row_text(row, "data_type").unwrap_or_default(),
                length: row_int(row, "length"),
                nullable: row_text(row, "nullable")
                    .map(|n| n.eq_ignore_ascii_case("YES"))
                    .unwrap_or(true),
                default_value: row_text(row, "default_value"),
                comment: row_text(row, "comment").filter(|c| !c.is_empty()),
                scale: row_int(row, "scale"),
                column_name,
            })
        })
        .collect())
}

/// Lower-cased names of a table's columns
pub async fn column_names<C: ConnectionTrait>(
    conn: &C,
    connector: &dyn DialectConnector,
    store: &str,
    schema: Option<&str>,
    table: &str,
) -> Result<HashSet<String>, EngineError> {
    let sql = connector.columns_query(schema, table);
    Ok(query_rows(conn, store, &sql, vec![])
        .await?
        .iter()
        .filter_map(|row| row_text(row, "column_name"))
        .map(|name| name.to_lowercase())
        .collect())
}

pub async fn list_schemas<C: ConnectionTrait>(
    conn: &C,
    connector: &dyn DialectConnector,
    store: &str,
) -> Result<Vec<String>, EngineError> {
    let sql = connector
        .schemas_query()
        .ok_or_else(|| EngineError::UnsupportedOperation {
            operation: "list_schemas".to_string(),
            dialect: connector.code().to_string(),
        })?;
    Ok(query_rows(conn, store, &sql, vec![])
        .await?
        .iter()
        .filter_map(|row| row_text(row, "schema_name"))
        .collect())
}
