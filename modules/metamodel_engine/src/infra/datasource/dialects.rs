//! One connector per supported dialect

use super::connector::{
    generic_property_type, require_database, require_host, sql_literal, DialectConnector,
};
use crate::contract::{DataSource, DataType, EngineError};

fn host_port(datasource: &DataSource, code: &str, default_port: u16) -> Result<String, EngineError> {
    let host = require_host(datasource, code)?;
    Ok(format!("{host}:{}", datasource.port.unwrap_or(default_port)))
}

// ===== PostgreSQL =====

#[derive(Debug, Default)]
pub struct PostgresConnector;

impl DialectConnector for PostgresConnector {
    fn code(&self) -> &'static str {
        "POSTGRESQL"
    }

    fn display_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn description(&self) -> &'static str {
        "PostgreSQL with schema support; catalog lookups default to the public schema"
    }

    fn driver(&self) -> &'static str {
        "sqlx-postgres"
    }

    fn default_port(&self) -> Option<u16> {
        Some(5432)
    }

    fn requires_database(&self) -> bool {
        true
    }

    fn requires_schema(&self) -> bool {
        true
    }

    fn build_url(&self, datasource: &DataSource) -> Result<String, EngineError> {
        let authority = host_port(datasource, self.code(), 5432)?;
        let database = require_database(datasource, self.code())?;
        let mut url = format!("postgres://{authority}/{}", urlencoding::encode(database));
        if let Some(schema) = datasource.schema_name.as_deref().filter(|s| !s.is_empty()) {
            url.push_str("?options=");
            url.push_str(&urlencoding::encode(&format!("-csearch_path={schema}")));
        }
        Ok(url)
    }

    fn column_type(&self, data_type: DataType) -> &'static str {
        match data_type {
            DataType::String => "VARCHAR(255)",
            DataType::Text => "TEXT",
            DataType::Integer => "INTEGER",
            DataType::Long => "BIGINT",
            DataType::Float => "REAL",
            DataType::Double => "DOUBLE PRECISION",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Json => "JSONB",
            DataType::Uuid => "UUID",
            DataType::Blob => "BYTEA",
            DataType::Other => "TEXT",
        }
    }

    fn native_uuid(&self) -> bool {
        true
    }

    fn uuid_default(&self) -> Option<&'static str> {
        Some("gen_random_uuid()")
    }

    fn native_json(&self) -> bool {
        true
    }

    fn supports_column_if_exists(&self) -> bool {
        true
    }

    fn normalize_schema(&self, schema: Option<&str>) -> Option<String> {
        Some(
            schema
                .filter(|s| !s.is_empty())
                .unwrap_or("public")
                .to_string(),
        )
    }

    // information_schema columns are domain types; cast them so rows decode as text

    fn tables_query(&self, schema: Option<&str>, include_views: bool) -> String {
        let types = if include_views {
            "('BASE TABLE', 'VIEW')"
        } else {
            "('BASE TABLE')"
        };
        format!(
            "SELECT CAST(table_name AS TEXT) AS table_name FROM information_schema.tables \
             WHERE {} AND table_type IN {types} ORDER BY table_name",
            self.scope_predicate("table_schema", schema)
        )
    }

    fn columns_query(&self, schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT CAST(column_name AS TEXT) AS column_name, CAST(data_type AS TEXT) AS data_type, \
             CAST(character_maximum_length AS BIGINT) AS length, \
             CAST(is_nullable AS TEXT) AS nullable, CAST(column_default AS TEXT) AS default_value, \
             CAST(NULL AS TEXT) AS comment, CAST(numeric_scale AS BIGINT) AS scale \
             FROM information_schema.columns \
             WHERE {} AND table_name = {} ORDER BY ordinal_position",
            self.scope_predicate("table_schema", schema),
            sql_literal(table)
        )
    }

    fn primary_keys_query(&self, schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT CAST(kcu.column_name AS TEXT) AS column_name \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
             ON tc.constraint_name = kcu.constraint_name \
             AND tc.table_schema = kcu.table_schema AND tc.table_name = kcu.table_name \
             WHERE tc.constraint_type = 'PRIMARY KEY' AND {} AND tc.table_name = {}",
            self.scope_predicate("tc.table_schema", schema),
            sql_literal(table)
        )
    }

    fn schemas_query(&self) -> Option<String> {
        Some(
            "SELECT CAST(schema_name AS TEXT) AS schema_name \
             FROM information_schema.schemata ORDER BY schema_name"
                .to_string(),
        )
    }
}

// ===== MySQL / MariaDB =====

/// MySQL wire-compatible engines; schemas are the connection's database
#[derive(Debug)]
pub struct MySqlConnector {
    mariadb: bool,
}

impl MySqlConnector {
    pub fn mysql() -> Self {
        Self { mariadb: false }
    }

    pub fn mariadb() -> Self {
        Self { mariadb: true }
    }
}

impl DialectConnector for MySqlConnector {
    fn code(&self) -> &'static str {
        if self.mariadb {
            "MARIADB"
        } else {
            "MYSQL"
        }
    }

    fn display_name(&self) -> &'static str {
        if self.mariadb {
            "MariaDB"
        } else {
            "MySQL"
        }
    }

    fn description(&self) -> &'static str {
        "MySQL protocol; the connected database acts as the catalog, schemas are not used"
    }

    fn driver(&self) -> &'static str {
        "sqlx-mysql"
    }

    fn default_port(&self) -> Option<u16> {
        Some(3306)
    }

    fn requires_database(&self) -> bool {
        true
    }

    fn requires_schema(&self) -> bool {
        false
    }

    fn build_url(&self, datasource: &DataSource) -> Result<String, EngineError> {
        let authority = host_port(datasource, self.code(), 3306)?;
        let database = require_database(datasource, self.code())?;
        Ok(format!("mysql://{authority}/{}", urlencoding::encode(database)))
    }

    fn column_type(&self, data_type: DataType) -> &'static str {
        match data_type {
            DataType::String => "VARCHAR(255)",
            DataType::Text => "TEXT",
            DataType::Integer => "INTEGER",
            DataType::Long => "BIGINT",
            DataType::Float => "REAL",
            DataType::Double => "DOUBLE PRECISION",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Timestamp => "DATETIME",
            DataType::Json => "JSON",
            DataType::Uuid => "VARCHAR(36)",
            DataType::Blob => "LONGBLOB",
            DataType::Other => "TEXT",
        }
    }

    fn native_json(&self) -> bool {
        !self.mariadb
    }

    fn supports_column_if_exists(&self) -> bool {
        self.mariadb
    }

    fn supports_index_if_not_exists(&self) -> bool {
        self.mariadb
    }

    fn normalize_schema(&self, _schema: Option<&str>) -> Option<String> {
        None
    }

    fn current_catalog_expr(&self) -> Option<&'static str> {
        Some("DATABASE()")
    }

    fn columns_query(&self, schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT column_name AS column_name, data_type AS data_type, \
             character_maximum_length AS length, is_nullable AS nullable, \
             column_default AS default_value, column_comment AS comment, numeric_scale AS scale \
             FROM information_schema.columns \
             WHERE {} AND table_name = {} ORDER BY ordinal_position",
            self.scope_predicate("table_schema", schema),
            sql_literal(table)
        )
    }
}

// ===== SQLite =====

/// Embedded file database; `database_name` is the file path
#[derive(Debug, Default)]
pub struct SqliteConnector;

impl DialectConnector for SqliteConnector {
    fn code(&self) -> &'static str {
        "SQLITE"
    }

    fn display_name(&self) -> &'static str {
        "SQLite"
    }

    fn description(&self) -> &'static str {
        "Embedded SQLite file; no server, no schemas"
    }

    fn driver(&self) -> &'static str {
        "sqlx-sqlite"
    }

    fn default_port(&self) -> Option<u16> {
        None
    }

    fn requires_database(&self) -> bool {
        true
    }

    fn requires_schema(&self) -> bool {
        false
    }

    fn build_url(&self, datasource: &DataSource) -> Result<String, EngineError> {
        let path = require_database(datasource, self.code())?;
        Ok(format!("sqlite://{path}?mode=rwc"))
    }

    fn column_type(&self, data_type: DataType) -> &'static str {
        match data_type {
            DataType::String => "VARCHAR(255)",
            DataType::Text => "TEXT",
            DataType::Integer => "INTEGER",
            DataType::Long => "BIGINT",
            DataType::Float => "REAL",
            DataType::Double => "DOUBLE PRECISION",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Json => "TEXT",
            DataType::Uuid => "VARCHAR(36)",
            DataType::Blob => "BLOB",
            DataType::Other => "TEXT",
        }
    }

    fn normalize_schema(&self, _schema: Option<&str>) -> Option<String> {
        None
    }

    fn tables_query(&self, _schema: Option<&str>, include_views: bool) -> String {
        let types = if include_views {
            "('table', 'view')"
        } else {
            "('table')"
        };
        format!(
            "SELECT name AS table_name FROM sqlite_master \
             WHERE type IN {types} AND name NOT LIKE 'sqlite_%' ORDER BY name"
        )
    }

    fn table_exists_query(&self, _schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT 1 AS present FROM sqlite_master WHERE type = 'table' AND name = {}",
            sql_literal(table)
        )
    }

    fn columns_query(&self, _schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT name AS column_name, type AS data_type, NULL AS length, \
             CASE WHEN \"notnull\" = 0 THEN 'YES' ELSE 'NO' END AS nullable, \
             dflt_value AS default_value, NULL AS comment, NULL AS scale \
             FROM pragma_table_info({}) ORDER BY cid",
            sql_literal(table)
        )
    }

    fn primary_keys_query(&self, _schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT name AS column_name FROM pragma_table_info({}) WHERE pk > 0",
            sql_literal(table)
        )
    }
}

// ===== SQL Server =====

#[derive(Debug, Default)]
pub struct SqlServerConnector;

impl DialectConnector for SqlServerConnector {
    fn code(&self) -> &'static str {
        "SQL_SERVER"
    }

    fn display_name(&self) -> &'static str {
        "SQL Server"
    }

    fn description(&self) -> &'static str {
        "Microsoft SQL Server; bracket-quoted identifiers, OFFSET/FETCH pagination"
    }

    fn driver(&self) -> &'static str {
        "tiberius"
    }

    fn default_port(&self) -> Option<u16> {
        Some(1433)
    }

    fn requires_database(&self) -> bool {
        true
    }

    fn requires_schema(&self) -> bool {
        true
    }

    fn build_url(&self, datasource: &DataSource) -> Result<String, EngineError> {
        let authority = host_port(datasource, self.code(), 1433)?;
        let database = require_database(datasource, self.code())?;
        Ok(format!("mssql://{authority}/{}", urlencoding::encode(database)))
    }

    fn column_type(&self, data_type: DataType) -> &'static str {
        match data_type {
            DataType::String => "NVARCHAR(255)",
            DataType::Text => "NVARCHAR(MAX)",
            DataType::Integer => "INTEGER",
            DataType::Long => "BIGINT",
            DataType::Float => "REAL",
            DataType::Double => "DOUBLE PRECISION",
            DataType::Boolean => "BIT",
            DataType::Date => "DATE",
            DataType::Timestamp => "DATETIME2",
            DataType::Json => "NVARCHAR(MAX)",
            DataType::Uuid => "VARCHAR(36)",
            DataType::Blob => "VARBINARY(MAX)",
            DataType::Other => "NVARCHAR(MAX)",
        }
    }

    fn paginate(&self, limit: u64, offset: u64) -> String {
        format!("OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY")
    }

    /// OFFSET/FETCH is only valid after an ORDER BY
    fn first_rows(&self, limit: u64) -> String {
        format!("ORDER BY (SELECT NULL) {}", self.paginate(limit, 0))
    }

    fn supports_index_if_not_exists(&self) -> bool {
        false
    }

    fn schemas_query(&self) -> Option<String> {
        Some("SELECT name AS schema_name FROM sys.schemas ORDER BY name".to_string())
    }
}

// ===== Oracle =====

/// Oracle; `database_name` is the service name and schemas are owners
#[derive(Debug, Default)]
pub struct OracleConnector;

impl DialectConnector for OracleConnector {
    fn code(&self) -> &'static str {
        "ORACLE"
    }

    fn display_name(&self) -> &'static str {
        "Oracle"
    }

    fn description(&self) -> &'static str {
        "Oracle Database; upper-case quoted identifiers, NUMBER(1) booleans"
    }

    fn driver(&self) -> &'static str {
        "oracle"
    }

    fn default_port(&self) -> Option<u16> {
        Some(1521)
    }

    fn requires_database(&self) -> bool {
        true
    }

    fn requires_schema(&self) -> bool {
        true
    }

    fn build_url(&self, datasource: &DataSource) -> Result<String, EngineError> {
        let authority = host_port(datasource, self.code(), 1521)?;
        let service = require_database(datasource, self.code())?;
        Ok(format!("oracle://{authority}/{}", urlencoding::encode(service)))
    }

    fn column_type(&self, data_type: DataType) -> &'static str {
        match data_type {
            DataType::String => "VARCHAR2(255)",
            DataType::Text => "CLOB",
            DataType::Integer => "INTEGER",
            DataType::Long => "NUMBER(19)",
            DataType::Float => "REAL",
            DataType::Double => "DOUBLE PRECISION",
            DataType::Boolean => "NUMBER(1)",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Json => "CLOB",
            DataType::Uuid => "VARCHAR2(36)",
            DataType::Blob => "BLOB",
            DataType::Other => "CLOB",
        }
    }

    fn property_type(&self, db_type: &str) -> DataType {
        let compact: String = db_type
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        match compact.as_str() {
            "NUMBER(1)" | "NUMBER(1,0)" => DataType::Boolean,
            "NUMBER(19)" | "NUMBER(19,0)" => DataType::Long,
            _ => generic_property_type(db_type),
        }
    }

    fn native_boolean(&self) -> bool {
        false
    }

    fn normalize_schema(&self, schema: Option<&str>) -> Option<String> {
        schema.filter(|s| !s.is_empty()).map(str::to_uppercase)
    }

    fn current_catalog_expr(&self) -> Option<&'static str> {
        Some("SYS_CONTEXT('USERENV', 'CURRENT_SCHEMA')")
    }

    fn paginate(&self, limit: u64, offset: u64) -> String {
        format!("OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY")
    }

    fn supports_index_if_not_exists(&self) -> bool {
        false
    }

    fn tables_query(&self, schema: Option<&str>, include_views: bool) -> String {
        let scope = self.scope_predicate("owner", schema);
        let mut sql = format!("SELECT table_name AS table_name FROM all_tables WHERE {scope}");
        if include_views {
            sql.push_str(&format!(
                " UNION ALL SELECT view_name AS table_name FROM all_views WHERE {scope}"
            ));
        }
        sql
    }

    fn table_exists_query(&self, schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT 1 AS present FROM all_tables WHERE {} AND table_name = {}",
            self.scope_predicate("owner", schema),
            sql_literal(&table.to_uppercase())
        )
    }

    fn columns_query(&self, schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT c.column_name AS column_name, c.data_type AS data_type, \
             c.data_length AS length, CASE c.nullable WHEN 'Y' THEN 'YES' ELSE 'NO' END AS nullable, \
             c.data_default AS default_value, cc.comments AS comment, c.data_scale AS scale \
             FROM all_tab_columns c LEFT JOIN all_col_comments cc \
             ON cc.owner = c.owner AND cc.table_name = c.table_name AND cc.column_name = c.column_name \
             WHERE {} AND c.table_name = {} ORDER BY c.column_id",
            self.scope_predicate("c.owner", schema),
            sql_literal(&table.to_uppercase())
        )
    }

    fn primary_keys_query(&self, schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT cols.column_name AS column_name FROM all_constraints cons \
             JOIN all_cons_columns cols \
             ON cons.constraint_name = cols.constraint_name AND cons.owner = cols.owner \
             WHERE cons.constraint_type = 'P' AND {} AND cols.table_name = {}",
            self.scope_predicate("cons.owner", schema),
            sql_literal(&table.to_uppercase())
        )
    }

    fn schemas_query(&self) -> Option<String> {
        Some("SELECT username AS schema_name FROM all_users ORDER BY username".to_string())
    }
}

// ===== Generic =====

/// Any engine reachable through an explicit connection URL
#[derive(Debug, Default)]
pub struct GenericConnector;

impl DialectConnector for GenericConnector {
    fn code(&self) -> &'static str {
        "GENERIC"
    }

    fn display_name(&self) -> &'static str {
        "Generic SQL"
    }

    fn description(&self) -> &'static str {
        "Standard SQL over information_schema; requires a full connection url"
    }

    fn driver(&self) -> &'static str {
        "url-scheme"
    }

    fn default_port(&self) -> Option<u16> {
        None
    }

    fn requires_database(&self) -> bool {
        false
    }

    fn requires_schema(&self) -> bool {
        false
    }

    fn build_url(&self, datasource: &DataSource) -> Result<String, EngineError> {
        Err(EngineError::Validation {
            message: format!(
                "datasource '{}' uses the generic dialect and needs a connection url",
                datasource.code
            ),
        })
    }

    fn column_type(&self, data_type: DataType) -> &'static str {
        match data_type {
            DataType::String => "VARCHAR(255)",
            DataType::Text => "TEXT",
            DataType::Integer => "INTEGER",
            DataType::Long => "BIGINT",
            DataType::Float => "REAL",
            DataType::Double => "DOUBLE PRECISION",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Json => "TEXT",
            DataType::Uuid => "VARCHAR(36)",
            DataType::Blob => "BLOB",
            DataType::Other => "TEXT",
        }
    }
}
