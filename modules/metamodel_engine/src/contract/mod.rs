//! Contract layer - public API for inter-module communication
//!
//! This layer contains transport-agnostic models and the native client traits.
//! NO serde derives on models - these are pure domain types.

pub mod client;
pub mod error;
pub mod model;

pub use client::{DatasourceApi, InstanceApi, QueryApi, SchemaApi};
pub use error::{EngineError, ErrorKind};
pub use model::{
    BusinessDomain, DataSource, DataType, DialectInfo, InstanceData, InstancePage, LinkInstance,
    LinkType, ObjectType, Property, StorageBinding, TableColumnInfo, is_reserved_column,
    RESERVED_COLUMNS,
};
