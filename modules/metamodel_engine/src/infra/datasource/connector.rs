//! Dialect connector abstraction
//!
//! A connector knows one database dialect: how to build its connection URL, how
//! to quote identifiers, which native column type backs each [`DataType`], and
//! which catalog queries introspect it. Statement execution lives in
//! [`super::sql`]; connectors only produce SQL text.

use crate::contract::{DataSource, DataType, DialectInfo, EngineError};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;

/// URL schemes with a compiled driver
const COMPILED_SCHEMES: [&str; 4] = ["postgres", "postgresql", "mysql", "sqlite"];

/// Identifier quoting rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Backtick,
    DoubleQuote,
    Bracket,
    /// Upper-cased, then double-quoted
    UpperDoubleQuote,
    None,
}

impl QuoteStyle {
    /// Pick the quoting rule for a dialect code (case-insensitive)
    pub fn for_dialect(code: &str) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "MYSQL" | "MARIADB" => QuoteStyle::Backtick,
            "POSTGRESQL" => QuoteStyle::DoubleQuote,
            "SQL_SERVER" | "SQLSERVER" => QuoteStyle::Bracket,
            "ORACLE" => QuoteStyle::UpperDoubleQuote,
            _ => QuoteStyle::None,
        }
    }

    pub fn quote(self, ident: &str) -> String {
        match self {
            QuoteStyle::Backtick => format!("`{}`", ident.replace('`', "``")),
            QuoteStyle::DoubleQuote => format!("\"{}\"", ident.replace('"', "\"\"")),
            QuoteStyle::Bracket => format!("[{}]", ident.replace(']', "]]")),
            QuoteStyle::UpperDoubleQuote => {
                format!("\"{}\"", ident.to_uppercase().replace('"', "\"\""))
            }
            QuoteStyle::None => ident.to_string(),
        }
    }
}

/// Render a string as a SQL literal, doubling embedded quotes
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Connector for one database dialect
#[async_trait::async_trait]
pub trait DialectConnector: Send + Sync {
    /// Registry key, upper case (e.g. `POSTGRESQL`)
    fn code(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Driver identity used to open connections
    fn driver(&self) -> &'static str;

    fn default_port(&self) -> Option<u16>;

    fn requires_database(&self) -> bool;

    fn requires_schema(&self) -> bool;

    /// Build a connection URL from host/port/database/schema, without credentials
    fn build_url(&self, datasource: &DataSource) -> Result<String, EngineError>;

    /// Native column type for a property data type
    fn column_type(&self, data_type: DataType) -> &'static str;

    /// Closest property data type for a native column type
    fn property_type(&self, db_type: &str) -> DataType {
        generic_property_type(db_type)
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::for_dialect(self.code())
    }

    fn quote(&self, ident: &str) -> String {
        self.quote_style().quote(ident)
    }

    /// Whether `UUID` is a native column type
    fn native_uuid(&self) -> bool {
        false
    }

    /// Default expression generating a random UUID, when the dialect has one
    fn uuid_default(&self) -> Option<&'static str> {
        None
    }

    /// Whether JSON values bind as native JSON rather than serialized text
    fn native_json(&self) -> bool {
        false
    }

    /// Whether `BOOLEAN` is a native column type
    fn native_boolean(&self) -> bool {
        true
    }

    /// Whether `ADD COLUMN IF NOT EXISTS` / `DROP COLUMN IF EXISTS` are accepted
    fn supports_column_if_exists(&self) -> bool {
        false
    }

    /// Whether `CREATE INDEX IF NOT EXISTS` is accepted
    fn supports_index_if_not_exists(&self) -> bool {
        true
    }

    /// Schema used for catalog lookups; `None` when the dialect has no schemas
    fn normalize_schema(&self, schema: Option<&str>) -> Option<String> {
        schema.filter(|s| !s.is_empty()).map(str::to_string)
    }

    /// SQL expression naming the connection's catalog, used when no schema applies
    fn current_catalog_expr(&self) -> Option<&'static str> {
        None
    }

    /// Pagination clause appended after `ORDER BY`
    fn paginate(&self, limit: u64, offset: u64) -> String {
        format!("LIMIT {limit} OFFSET {offset}")
    }

    /// Row limit for a query that has no `ORDER BY` of its own
    fn first_rows(&self, limit: u64) -> String {
        self.paginate(limit, 0)
    }

    fn info(&self) -> DialectInfo {
        DialectInfo {
            code: self.code().to_string(),
            display_name: self.display_name().to_string(),
            default_port: self.default_port(),
            requires_database: self.requires_database(),
            requires_schema: self.requires_schema(),
            description: self.description().to_string(),
        }
    }

    /// Predicate restricting an information_schema column to the target schema/catalog
    fn scope_predicate(&self, column: &str, schema: Option<&str>) -> String {
        match self.normalize_schema(schema) {
            Some(schema) => format!("{column} = {}", sql_literal(&schema)),
            None => match self.current_catalog_expr() {
                Some(expr) => format!("{column} = {expr}"),
                None => "1 = 1".to_string(),
            },
        }
    }

    /// Catalog query yielding `table_name` for tables (and views when asked)
    fn tables_query(&self, schema: Option<&str>, include_views: bool) -> String {
        let types = if include_views {
            "('BASE TABLE', 'VIEW')"
        } else {
            "('BASE TABLE')"
        };
        format!(
            "SELECT table_name AS table_name FROM information_schema.tables \
             WHERE {} AND table_type IN {types} ORDER BY table_name",
            self.scope_predicate("table_schema", schema)
        )
    }

    /// Catalog query yielding `present` when the base table exists
    fn table_exists_query(&self, schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT 1 AS present FROM information_schema.tables \
             WHERE {} AND table_name = {} AND table_type = 'BASE TABLE'",
            self.scope_predicate("table_schema", schema),
            sql_literal(table)
        )
    }

    /// Catalog query yielding column metadata: `column_name`, `data_type`,
    /// `length`, `nullable` (`YES`/`NO`), `default_value`, `comment`, `scale`
    fn columns_query(&self, schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT column_name AS column_name, data_type AS data_type, \
             character_maximum_length AS length, is_nullable AS nullable, \
             column_default AS default_value, NULL AS comment, numeric_scale AS scale \
             FROM information_schema.columns \
             WHERE {} AND table_name = {} ORDER BY ordinal_position",
            self.scope_predicate("table_schema", schema),
            sql_literal(table)
        )
    }

    /// Catalog query yielding the `column_name` of every primary key column
    fn primary_keys_query(&self, schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT kcu.column_name AS column_name \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
             ON tc.constraint_name = kcu.constraint_name \
             AND tc.table_schema = kcu.table_schema AND tc.table_name = kcu.table_name \
             WHERE tc.constraint_type = 'PRIMARY KEY' AND {} AND tc.table_name = {}",
            self.scope_predicate("tc.table_schema", schema),
            sql_literal(table)
        )
    }

    /// Catalog query yielding `schema_name`; `None` when schemas are unsupported
    fn schemas_query(&self) -> Option<String> {
        None
    }

    /// Resolve the URL to connect with: the explicit URL when present, else a built one
    fn connection_url(
        &self,
        datasource: &DataSource,
        password: Option<&str>,
    ) -> Result<String, EngineError> {
        let base = match datasource.connection_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => url.to_string(),
            None => self.build_url(datasource)?,
        };
        with_credentials(&base, datasource.username.as_deref(), password)
    }

    /// Open a single-connection pool for the datasource
    async fn create_connection(
        &self,
        datasource: &DataSource,
        password: Option<&str>,
        timeout: Duration,
    ) -> Result<DatabaseConnection, EngineError> {
        let url = self.connection_url(datasource, password)?;
        if !driver_available(&url) {
            return Err(EngineError::connection(
                &datasource.code,
                format!("driver '{}' not available", self.driver()),
            ));
        }
        tracing::debug!(
            datasource = %datasource.code,
            url = %redact_url(&url),
            "opening datasource connection"
        );

        let mut options = ConnectOptions::new(url);
        options
            .max_connections(1)
            .min_connections(0)
            .connect_timeout(timeout)
            .acquire_timeout(timeout)
            .sqlx_logging(false);

        Database::connect(options).await.map_err(|e| {
            let mut message = e.to_string();
            if let Some(secret) = password.filter(|p| !p.is_empty()) {
                message = message.replace(secret, "***");
            }
            EngineError::connection(&datasource.code, message)
        })
    }
}

/// Whether a compiled driver accepts the URL's scheme
pub fn driver_available(url: &str) -> bool {
    url.split_once(':')
        .map(|(scheme, _)| COMPILED_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Inject credentials into a URL that does not already carry them
pub fn with_credentials(
    base: &str,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<String, EngineError> {
    let Some(username) = username.filter(|u| !u.is_empty()) else {
        return Ok(base.to_string());
    };
    let mut url = url::Url::parse(base).map_err(|e| EngineError::Validation {
        message: format!("invalid connection url: {e}"),
    })?;
    if !url.username().is_empty() || url.host_str().map_or(true, str::is_empty) {
        return Ok(base.to_string());
    }
    url.set_username(username)
        .and_then(|_| url.set_password(password.filter(|p| !p.is_empty())))
        .map_err(|_| EngineError::Validation {
            message: "connection url cannot carry credentials".to_string(),
        })?;
    Ok(url.to_string())
}

/// Replace the password of a URL for logging
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        Ok(url) => url.to_string(),
        Err(_) => "<unparseable url>".to_string(),
    }
}

/// Host and database taken from the record, required by URL-building dialects
pub(crate) fn require_host<'a>(
    datasource: &'a DataSource,
    code: &str,
) -> Result<&'a str, EngineError> {
    datasource
        .host
        .as_deref()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| EngineError::Validation {
            message: format!(
                "datasource '{}' ({code}) needs a host or a connection url",
                datasource.code
            ),
        })
}

pub(crate) fn require_database<'a>(
    datasource: &'a DataSource,
    code: &str,
) -> Result<&'a str, EngineError> {
    datasource
        .database_name
        .as_deref()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| EngineError::Validation {
            message: format!(
                "datasource '{}' ({code}) needs a database name",
                datasource.code
            ),
        })
}

/// Dialect-neutral reverse type mapping
pub fn generic_property_type(db_type: &str) -> DataType {
    let upper = db_type.trim().to_ascii_uppercase();
    let base = upper.split('(').next().unwrap_or_default().trim();
    match base {
        "VARCHAR" | "VARCHAR2" | "NVARCHAR" | "NVARCHAR2" | "CHAR" | "NCHAR" | "CHARACTER"
        | "CHARACTER VARYING" | "STRING" => {
            if upper.contains("MAX") {
                DataType::Text
            } else {
                DataType::String
            }
        }
        "TEXT" | "CLOB" | "NCLOB" | "NTEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" => {
            DataType::Text
        }
        "INT" | "INTEGER" | "INT4" | "INT2" | "SMALLINT" | "TINYINT" | "MEDIUMINT" => {
            DataType::Integer
        }
        "BIGINT" | "INT8" | "LONG" => DataType::Long,
        "REAL" | "FLOAT4" | "FLOAT" => DataType::Float,
        "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" | "NUMERIC" | "DECIMAL" | "NUMBER" => {
            DataType::Double
        }
        "BOOLEAN" | "BOOL" | "BIT" => DataType::Boolean,
        "DATE" => DataType::Date,
        "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" | "DATETIME2" | "SMALLDATETIME"
        | "TIMESTAMP WITHOUT TIME ZONE" | "TIMESTAMP WITH TIME ZONE" => DataType::Timestamp,
        "JSON" | "JSONB" => DataType::Json,
        "UUID" | "UNIQUEIDENTIFIER" => DataType::Uuid,
        "BLOB" | "BYTEA" | "LONGBLOB" | "MEDIUMBLOB" | "VARBINARY" | "BINARY" | "IMAGE" => {
            DataType::Blob
        }
        _ => DataType::Other,
    }
}
