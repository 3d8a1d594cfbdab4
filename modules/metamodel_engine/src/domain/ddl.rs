//! DDL text generation for instance tables
//!
//! Table naming lives here and nowhere else: every operation that touches an
//! instance table derives its name through [`instance_table_name`].

use crate::contract::{is_reserved_column, DataType, EngineError, Property};
use crate::infra::datasource::DialectConnector;
use std::sync::Arc;

/// Prefix used when an object type has no business domain
pub const DEFAULT_DOMAIN_PREFIX: &str = "default";

/// Replace every character outside `[a-z0-9_]` with `_`; empty input is rejected
pub fn sanitize_identifier(name: &str) -> Result<String, EngineError> {
    if name.is_empty() {
        return Err(EngineError::InvalidIdentifier {
            reason: "identifier must not be empty".to_string(),
        });
    }
    Ok(name
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect())
}

/// `<domain>_<object type>`, both lower-cased and sanitized
pub fn instance_table_name(
    domain_code: Option<&str>,
    object_type_name: &str,
) -> Result<String, EngineError> {
    let prefix = match domain_code {
        Some(code) => sanitize_identifier(&code.to_lowercase())?,
        None => DEFAULT_DOMAIN_PREFIX.to_string(),
    };
    let name = sanitize_identifier(&object_type_name.to_lowercase())?;
    Ok(format!("{prefix}_{name}"))
}

/// Physical shape of an instance table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// Platform store: native UUID keys where available, plus lookup indexes
    Platform,
    /// External storage datasource: 36-char string keys, no indexes
    External,
}

/// A physical store an instance table lives in
#[derive(Clone)]
pub struct StoreTarget {
    /// `platform` or the datasource code; used in logs and errors
    pub label: String,
    pub connector: Arc<dyn DialectConnector>,
    pub layout: TableLayout,
    pub schema: Option<String>,
}

impl StoreTarget {
    /// Whether ids bind as native UUIDs rather than strings
    pub fn native_ids(&self) -> bool {
        self.layout == TableLayout::Platform && self.connector.native_uuid()
    }

    /// Schema-qualified, quoted table reference
    pub fn qualified(&self, table: &str) -> String {
        let quoted = self.connector.quote(table);
        match self.schema.as_deref().filter(|s| !s.is_empty()) {
            Some(schema) if self.connector.requires_schema() => {
                format!("{}.{quoted}", self.connector.quote(schema))
            }
            _ => quoted,
        }
    }

    pub fn quote(&self, ident: &str) -> String {
        self.connector.quote(ident)
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }
}

/// Render a property default as a SQL literal.
///
/// Numeric and boolean defaults are emitted unquoted after checking they parse;
/// everything else becomes a quoted string literal.
pub fn format_default(
    value: &str,
    data_type: DataType,
    native_boolean: bool,
) -> Result<String, EngineError> {
    let invalid = || EngineError::Validation {
        message: format!("default value '{value}' is not a valid {data_type}"),
    };
    if !data_type.is_numeric_or_boolean() {
        return Ok(format!("'{}'", value.replace('\'', "''")));
    }
    let trimmed = value.trim();
    match data_type {
        DataType::Integer | DataType::Long => {
            trimmed.parse::<i64>().map_err(|_| invalid())?;
            Ok(trimmed.to_string())
        }
        DataType::Float | DataType::Double => {
            trimmed.parse::<f64>().map_err(|_| invalid())?;
            Ok(trimmed.to_string())
        }
        _ => {
            let flag = match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(invalid()),
            };
            Ok(match (native_boolean, flag) {
                (true, true) => "TRUE".to_string(),
                (true, false) => "FALSE".to_string(),
                (false, true) => "1".to_string(),
                (false, false) => "0".to_string(),
            })
        }
    }
}

/// Builds DDL statements for one store
pub struct DdlBuilder<'a> {
    target: &'a StoreTarget,
}

impl<'a> DdlBuilder<'a> {
    pub fn new(target: &'a StoreTarget) -> Self {
        Self { target }
    }

    fn connector(&self) -> &dyn DialectConnector {
        self.target.connector.as_ref()
    }

    fn key_type(&self) -> &'static str {
        if self.target.native_ids() {
            "UUID"
        } else if self.connector().native_uuid() {
            "VARCHAR(36)"
        } else {
            self.connector().column_type(DataType::Uuid)
        }
    }

    /// Column definition for a property, e.g. `"age" INTEGER NOT NULL DEFAULT 0`
    pub fn column_definition(&self, property: &Property) -> Result<String, EngineError> {
        let connector = self.connector();
        let mut def = format!(
            "{} {}",
            connector.quote(&property.column_name()),
            connector.column_type(property.data_type)
        );
        if property.required {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = property.default_value.as_deref().filter(|d| !d.is_empty()) {
            def.push_str(" DEFAULT ");
            def.push_str(&format_default(
                default,
                property.data_type,
                connector.native_boolean(),
            )?);
        }
        Ok(def)
    }

    /// `CREATE TABLE IF NOT EXISTS` followed, on the platform store, by the lookup indexes
    pub fn create_table(
        &self,
        table: &str,
        properties: &[Property],
    ) -> Result<Vec<String>, EngineError> {
        let connector = self.connector();
        let q = |name: &str| connector.quote(name);
        let key = self.key_type();
        let timestamp = connector.column_type(DataType::Timestamp);
        let audit_user = connector.column_type(DataType::String);

        let id = match (self.target.native_ids(), connector.uuid_default()) {
            (true, Some(default)) => format!("{} {key} PRIMARY KEY DEFAULT {default}", q("id")),
            _ => format!("{} {key} PRIMARY KEY", q("id")),
        };
        let mut columns = vec![
            id,
            format!("{} {key} NOT NULL", q("class_id")),
            format!("{} {key}", q("datasource_id")),
            format!("{} {timestamp} DEFAULT CURRENT_TIMESTAMP", q("created_at")),
            format!("{} {timestamp} DEFAULT CURRENT_TIMESTAMP", q("updated_at")),
            format!("{} {audit_user}", q("created_by")),
            format!("{} {audit_user}", q("updated_by")),
        ];
        for property in properties {
            if is_reserved_column(&property.column_name()) {
                tracing::warn!(
                    property = %property.name,
                    table,
                    "property collides with a system column, skipped"
                );
                continue;
            }
            columns.push(self.column_definition(property)?);
        }

        let qualified = self.target.qualified(table);
        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {qualified} (\n    {}\n)",
            columns.join(",\n    ")
        )];

        if self.target.layout == TableLayout::Platform {
            let suffix = sanitize_identifier(table)?;
            let guard = if connector.supports_index_if_not_exists() {
                "IF NOT EXISTS "
            } else {
                ""
            };
            for column in ["class_id", "datasource_id"] {
                statements.push(format!(
                    "CREATE INDEX {guard}{} ON {qualified} ({})",
                    q(&format!("idx_{suffix}_{column}")),
                    q(column)
                ));
            }
        }
        Ok(statements)
    }

    /// `ALTER TABLE ... ADD COLUMN`; `None` for properties named like system columns
    pub fn add_column(
        &self,
        table: &str,
        property: &Property,
    ) -> Result<Option<String>, EngineError> {
        if is_reserved_column(&property.column_name()) {
            tracing::warn!(property = %property.name, table, "reserved column name, skipped");
            return Ok(None);
        }
        let guard = if self.connector().supports_column_if_exists() {
            "IF NOT EXISTS "
        } else {
            ""
        };
        Ok(Some(format!(
            "ALTER TABLE {} ADD COLUMN {guard}{}",
            self.target.qualified(table),
            self.column_definition(property)?
        )))
    }

    pub fn drop_column(&self, table: &str, column: &str) -> String {
        let guard = if self.connector().supports_column_if_exists() {
            "IF EXISTS "
        } else {
            ""
        };
        format!(
            "ALTER TABLE {} DROP COLUMN {guard}{}",
            self.target.qualified(table),
            self.connector().quote(&column.to_lowercase())
        )
    }

    pub fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.target.qualified(table))
    }

    /// Query returning a row only when the column holds a non-null value
    pub fn column_data_query(&self, table: &str, column: &str) -> String {
        let connector = self.connector();
        format!(
            "SELECT 1 AS present FROM {} WHERE {} IS NOT NULL {}",
            self.target.qualified(table),
            connector.quote(&column.to_lowercase()),
            connector.first_rows(1)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::datasource::dialects::{
        MySqlConnector, OracleConnector, PostgresConnector, SqlServerConnector, SqliteConnector,
    };
    use uuid::Uuid;

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

    fn target(connector: Arc<dyn DialectConnector>, layout: TableLayout) -> StoreTarget {
        StoreTarget {
            label: "test".to_string(),
            connector,
            layout,
            schema: None,
        }
    }

    #[test]
    fn sanitize_replaces_everything_outside_the_alphabet() {
        assert_eq!(sanitize_identifier("crm-v2.person").unwrap(), "crm_v2_person");
        assert_eq!(sanitize_identifier("客户").unwrap(), "__");
        assert_eq!(sanitize_identifier("Upper").unwrap(), "_pper");
        assert!(matches!(
            sanitize_identifier(""),
            Err(EngineError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn table_name_is_domain_prefixed_and_stable() {
        let a = instance_table_name(Some("CRM"), "Sales Lead").unwrap();
        let b = instance_table_name(Some("CRM"), "Sales Lead").unwrap();
        assert_eq!(a, "crm_sales_lead");
        assert_eq!(a, b);
        assert_eq!(instance_table_name(None, "Person").unwrap(), "default_person");
        assert!(instance_table_name(Some(""), "Person").is_err());
        assert!(instance_table_name(None, "").is_err());
    }

    #[test]
    fn defaults_quote_text_and_keep_numbers_bare() {
        assert_eq!(format_default("42", DataType::Integer, true).unwrap(), "42");
        assert_eq!(format_default("1.5", DataType::Double, true).unwrap(), "1.5");
        assert_eq!(format_default("true", DataType::Boolean, true).unwrap(), "TRUE");
        assert_eq!(format_default("true", DataType::Boolean, false).unwrap(), "1");
        assert_eq!(format_default("it's", DataType::String, true).unwrap(), "'it''s'");
        assert_eq!(
            format_default("2024-01-01", DataType::Date, true).unwrap(),
            "'2024-01-01'"
        );
        assert!(format_default("1; DROP TABLE x", DataType::Integer, true).is_err());
    }

    #[test]
    fn column_data_query_limits_to_one_row() {
        let sqlite = target(Arc::new(SqliteConnector), TableLayout::External);
        assert_eq!(
            DdlBuilder::new(&sqlite).column_data_query("default_person", "Age"),
            "SELECT 1 AS present FROM default_person WHERE age IS NOT NULL LIMIT 1 OFFSET 0"
        );

        let mut mssql = target(Arc::new(SqlServerConnector), TableLayout::External);
        mssql.schema = Some("dbo".to_string());
        let sql = DdlBuilder::new(&mssql).column_data_query("default_person", "age");
        assert!(
            sql.ends_with("IS NOT NULL ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 1 ROWS ONLY"),
            "{sql}"
        );
    }

    #[test]
    fn only_numeric_and_boolean_defaults_are_bare() {
        for data_type in DataType::ALL {
            let rendered = format_default("1", data_type, false).unwrap();
            assert_eq!(
                rendered.starts_with('\''),
                !data_type.is_numeric_or_boolean(),
                "{data_type}: {rendered}"
            );
        }
    }

    #[test]
    fn platform_postgres_table_uses_native_uuid_and_indexes() {
        let t = target(Arc::new(PostgresConnector), TableLayout::Platform);
        let mut name = prop("Name", DataType::String);
        name.required = true;
        let mut active = prop("active", DataType::Boolean);
        active.default_value = Some("true".to_string());
        let statements = DdlBuilder::new(&t)
            .create_table(
                "crm_person",
                &[name, active, prop("created_at", DataType::Timestamp)],
            )
            .unwrap();

        assert_eq!(statements.len(), 3);
        let create = &statements[0];
        assert!(create.starts_with("CREATE TABLE IF NOT EXISTS \"crm_person\" ("));
        assert!(create.contains("\"id\" UUID PRIMARY KEY DEFAULT gen_random_uuid()"));
        assert!(create.contains("\"class_id\" UUID NOT NULL"));
        assert!(create.contains("\"datasource_id\" UUID"));
        assert!(create.contains("\"created_at\" TIMESTAMP DEFAULT CURRENT_TIMESTAMP"));
        assert!(create.contains("\"name\" VARCHAR(255) NOT NULL"));
        assert!(create.contains("\"active\" BOOLEAN DEFAULT TRUE"));
        assert_eq!(create.matches("created_at").count(), 1);

        assert_eq!(
            statements[1],
            "CREATE INDEX IF NOT EXISTS \"idx_crm_person_class_id\" ON \"crm_person\" (\"class_id\")"
        );
        assert!(statements[2].contains("idx_crm_person_datasource_id"));
    }

    #[test]
    fn external_table_uses_string_keys_and_no_indexes() {
        let t = target(Arc::new(PostgresConnector), TableLayout::External);
        let statements = DdlBuilder::new(&t)
            .create_table("crm_person", &[prop("tags", DataType::Json)])
            .unwrap();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("\"id\" VARCHAR(36) PRIMARY KEY"));
        assert!(statements[0].contains("\"class_id\" VARCHAR(36) NOT NULL"));
        assert!(statements[0].contains("\"tags\" JSONB"));

        let t = target(Arc::new(MySqlConnector::mysql()), TableLayout::External);
        let statements = DdlBuilder::new(&t)
            .create_table("crm_person", &[prop("tags", DataType::Json)])
            .unwrap();
        assert!(statements[0].contains("`id` VARCHAR(36) PRIMARY KEY"));
        assert!(statements[0].contains("`created_at` DATETIME DEFAULT CURRENT_TIMESTAMP"));
        assert!(statements[0].contains("`tags` JSON"));
    }

    #[test]
    fn schema_qualifies_only_schema_dialects() {
        let mut t = target(Arc::new(PostgresConnector), TableLayout::External);
        t.schema = Some("sales".to_string());
        assert_eq!(t.qualified("crm_person"), "\"sales\".\"crm_person\"");

        let mut t = target(Arc::new(SqliteConnector), TableLayout::External);
        t.schema = Some("sales".to_string());
        assert_eq!(t.qualified("crm_person"), "crm_person");
    }

    #[test]
    fn oracle_quotes_upper_case() {
        let t = target(Arc::new(OracleConnector), TableLayout::External);
        let statements = DdlBuilder::new(&t)
            .create_table("crm_person", &[prop("flag", DataType::Boolean)])
            .unwrap();
        assert!(statements[0].contains("\"CRM_PERSON\""));
        assert!(statements[0].contains("\"FLAG\" NUMBER(1)"));
    }

    #[test]
    fn column_changes_respect_dialect_guards() {
        let pg = target(Arc::new(PostgresConnector), TableLayout::Platform);
        let add = DdlBuilder::new(&pg)
            .add_column("crm_person", &prop("age", DataType::Integer))
            .unwrap()
            .unwrap();
        assert_eq!(
            add,
            "ALTER TABLE \"crm_person\" ADD COLUMN IF NOT EXISTS \"age\" INTEGER"
        );
        assert_eq!(
            DdlBuilder::new(&pg).drop_column("crm_person", "Age"),
            "ALTER TABLE \"crm_person\" DROP COLUMN IF EXISTS \"age\""
        );

        let sqlite = target(Arc::new(SqliteConnector), TableLayout::External);
        let add = DdlBuilder::new(&sqlite)
            .add_column("crm_person", &prop("age", DataType::Integer))
            .unwrap()
            .unwrap();
        assert_eq!(add, "ALTER TABLE crm_person ADD COLUMN age INTEGER");

        assert!(DdlBuilder::new(&pg)
            .add_column("crm_person", &prop("updated_by", DataType::String))
            .unwrap()
            .is_none());
    }
}
