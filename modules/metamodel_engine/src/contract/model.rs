//! Contract models for the metamodel engine
//!
//! These models are transport-agnostic and used for inter-module communication.
//! NO serde derives - these are pure domain models. Instance payloads are plain
//! JSON maps because their shape is defined at runtime by `Property` records.

use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Instance payload: property name -> value
pub type InstanceData = serde_json::Map<String, serde_json::Value>;

/// Columns every instance table carries regardless of its properties
pub const RESERVED_COLUMNS: [&str; 7] = [
    "id",
    "class_id",
    "datasource_id",
    "created_at",
    "updated_at",
    "created_by",
    "updated_by",
];

/// Whether a (lower-cased) column name collides with a system column
pub fn is_reserved_column(name: &str) -> bool {
    RESERVED_COLUMNS.contains(&name)
}

/// Business domain an object type belongs to; its code prefixes table names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessDomain {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

/// User-defined entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectType {
    pub id: Uuid,
    /// Unique name
    pub name: String,
    pub domain_id: Option<Uuid>,
    pub primary_key_field_name: Option<String>,
}

/// Generic property data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Text,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    Date,
    Timestamp,
    Json,
    Uuid,
    Blob,
    /// Any type name the engine does not know; stored as text, never validated
    Other,
}

impl DataType {
    /// Every variant, for exhaustive table checks
    pub const ALL: [DataType; 13] = [
        DataType::String,
        DataType::Text,
        DataType::Integer,
        DataType::Long,
        DataType::Float,
        DataType::Double,
        DataType::Boolean,
        DataType::Date,
        DataType::Timestamp,
        DataType::Json,
        DataType::Uuid,
        DataType::Blob,
        DataType::Other,
    ];

    /// Default literals of these types are emitted unquoted
    pub fn is_numeric_or_boolean(self) -> bool {
        matches!(
            self,
            DataType::Integer
                | DataType::Long
                | DataType::Float
                | DataType::Double
                | DataType::Boolean
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::String => "STRING",
            DataType::Text => "TEXT",
            DataType::Integer => "INTEGER",
            DataType::Long => "LONG",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Json => "JSON",
            DataType::Uuid => "UUID",
            DataType::Blob => "BLOB",
            DataType::Other => "OTHER",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = std::convert::Infallible;

    /// Case-insensitive; accepts the common SQL aliases. Unknown names map to `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.trim().to_ascii_uppercase().as_str() {
            "STRING" | "VARCHAR" => DataType::String,
            "TEXT" => DataType::Text,
            "INTEGER" | "INT" => DataType::Integer,
            "LONG" | "BIGINT" => DataType::Long,
            "FLOAT" | "REAL" => DataType::Float,
            "DOUBLE" => DataType::Double,
            "BOOLEAN" | "BOOL" => DataType::Boolean,
            "DATE" => DataType::Date,
            "TIMESTAMP" | "DATETIME" => DataType::Timestamp,
            "JSON" | "JSONB" => DataType::Json,
            "UUID" => DataType::Uuid,
            "BLOB" => DataType::Blob,
            _ => DataType::Other,
        };
        Ok(parsed)
    }
}

/// Typed field belonging to an object type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub id: Uuid,
    pub object_type_id: Uuid,
    /// Unique within its object type
    pub name: String,
    pub data_type: DataType,
    pub required: bool,
    pub default_value: Option<String>,
    pub sort_order: i32,
}

impl Property {
    /// Physical column name
    pub fn column_name(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Externally administered datasource record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub id: Uuid,
    /// Unique code, used in error messages and logs
    pub code: String,
    pub name: String,
    /// Dialect code, e.g. `POSTGRESQL`, `MYSQL`, `SQLITE`
    pub dialect: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_name: Option<String>,
    pub schema_name: Option<String>,
    pub username: Option<String>,
    /// Stored secret, possibly carrying the encryption prefix
    pub password: Option<String>,
    /// Fully specified URL; takes precedence over host/port/database
    pub connection_url: Option<String>,
    pub enabled: bool,
    pub status: Option<String>,
}

/// Association between an object type and a datasource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageBinding {
    pub id: Uuid,
    pub object_type_id: Uuid,
    pub datasource_id: Uuid,
    /// Mandatory when `is_storage` is false; ignored when it is true
    pub table_name: Option<String>,
    pub schema_name: Option<String>,
    pub is_storage: bool,
    pub is_default: bool,
    pub priority: i32,
}

/// Model-level edge between two object types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkType {
    pub id: Uuid,
    pub name: String,
    pub source_object_type_id: Uuid,
    pub target_object_type_id: Uuid,
    pub cardinality: String,
    pub bidirectional: bool,
}

/// Data-level edge between two instances
#[derive(Debug, Clone, PartialEq)]
pub struct LinkInstance {
    pub id: Uuid,
    pub link_type_id: Uuid,
    pub source_instance_id: Uuid,
    pub target_instance_id: Uuid,
    pub properties: Option<serde_json::Value>,
}

/// One page of a merged instance listing
#[derive(Debug, Clone, PartialEq)]
pub struct InstancePage {
    pub records: Vec<InstanceData>,
    /// Total number of matching records across every store
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Column metadata read from a live catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub length: Option<i64>,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
    pub comment: Option<String>,
    pub scale: Option<i64>,
}

/// Registered dialect description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectInfo {
    pub code: String,
    pub display_name: String,
    pub default_port: Option<u16>,
    pub requires_database: bool,
    pub requires_schema: bool,
    pub description: String,
}
