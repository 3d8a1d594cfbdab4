//! Domain layer - business logic and services

pub mod ddl;
pub mod dml;
pub mod query;
pub mod repository;
pub mod schema;
pub mod service;
pub mod storage;
pub mod table_manager;
pub mod validation;
pub mod values;

pub use query::QueryEngine;
pub use repository::{LinkInstanceRepository, TypeCatalog};
pub use schema::SchemaService;
pub use service::InstanceService;
pub use storage::{PlatformStore, StorageResolver};
pub use table_manager::DynamicTableManager;
