//! Metamodel Engine
//!
//! Stores instances of user-defined object types in dynamically managed
//! tables, either in the platform database or in registered external
//! datasources, and answers graph queries over the link model.

// Public exports
pub mod contract;
pub use contract::{
    BusinessDomain, DataSource, DataType, DatasourceApi, DialectInfo, EngineError, ErrorKind,
    InstanceApi, InstanceData, InstancePage, LinkInstance, LinkType, ObjectType, Property,
    QueryApi, SchemaApi, StorageBinding, TableColumnInfo,
};

pub mod config;
pub use config::Config;

pub mod module;
pub use module::{init_tracing, MetamodelEngine};

pub mod api;
pub use api::native::{NativeClient, RequestLimits};

// Internal modules (exposed for embedding and tests)
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
