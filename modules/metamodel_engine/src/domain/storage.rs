//! Storage resolution: which physical store an object type's instances live in

use super::ddl::{StoreTarget, TableLayout};
use super::repository::TypeCatalog;
use crate::contract::{DataSource, EngineError, ObjectType, StorageBinding};
use crate::infra::datasource::{ConnectionManager, DialectConnector};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

/// Label the platform store carries in logs and errors
pub const PLATFORM_LABEL: &str = "platform";

/// The system's own database
#[derive(Clone)]
pub struct PlatformStore {
    pub conn: Arc<DatabaseConnection>,
    pub target: StoreTarget,
}

impl PlatformStore {
    pub fn new(conn: Arc<DatabaseConnection>, connector: Arc<dyn DialectConnector>) -> Self {
        let schema = connector.normalize_schema(None);
        Self {
            conn,
            target: StoreTarget {
                label: PLATFORM_LABEL.to_string(),
                connector,
                layout: TableLayout::Platform,
                schema,
            },
        }
    }
}

/// A storage-bound external datasource
#[derive(Clone)]
pub struct ExternalStore {
    pub binding: StorageBinding,
    pub datasource: DataSource,
    pub target: StoreTarget,
}

/// Where an instance lives or is to be written
#[derive(Clone)]
pub enum StoreLocation {
    Platform,
    External(ExternalStore),
}

impl StoreLocation {
    pub fn label(&self) -> &str {
        match self {
            Self::Platform => PLATFORM_LABEL,
            Self::External(store) => &store.target.label,
        }
    }
}

pub struct StorageResolver {
    catalog: Arc<dyn TypeCatalog>,
    connections: Arc<ConnectionManager>,
}

impl StorageResolver {
    pub fn new(catalog: Arc<dyn TypeCatalog>, connections: Arc<ConnectionManager>) -> Self {
        Self {
            catalog,
            connections,
        }
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Storage bindings of an object type, highest priority first, defaults before others
    pub async fn storage_bindings(
        &self,
        object_type: &ObjectType,
    ) -> Result<Vec<StorageBinding>, EngineError> {
        let mut bindings: Vec<StorageBinding> = self
            .catalog
            .get_storage_bindings_by_object_type_id(object_type.id)
            .await?
            .into_iter()
            .filter(|b| b.is_storage)
            .collect();
        bindings.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.is_default.cmp(&a.is_default))
        });
        Ok(bindings)
    }

    /// Resolve a binding's datasource and connector
    pub async fn external_store(&self, binding: StorageBinding) -> Result<ExternalStore, EngineError> {
        let datasource = self
            .catalog
            .get_datasource(binding.datasource_id)
            .await?
            .ok_or_else(|| EngineError::not_found("datasource", binding.datasource_id))?;
        let connector = self.connections.connector_for(&datasource)?;
        let schema = connector.normalize_schema(
            binding
                .schema_name
                .as_deref()
                .or(datasource.schema_name.as_deref()),
        );
        Ok(ExternalStore {
            target: StoreTarget {
                label: datasource.code.clone(),
                connector,
                layout: TableLayout::External,
                schema,
            },
            binding,
            datasource,
        })
    }

    /// Pick the store a new or rewritten instance goes to.
    ///
    /// An explicit binding wins, then the default storage binding, then the platform.
    pub async fn resolve_write(
        &self,
        object_type: &ObjectType,
        storage_binding_id: Option<Uuid>,
    ) -> Result<StoreLocation, EngineError> {
        if let Some(binding_id) = storage_binding_id {
            let binding = self
                .catalog
                .get_storage_bindings_by_object_type_id(object_type.id)
                .await?
                .into_iter()
                .find(|b| b.id == binding_id)
                .ok_or_else(|| EngineError::not_found("storage_binding", binding_id))?;
            if !binding.is_storage {
                return Err(EngineError::Validation {
                    message: format!(
                        "storage binding {binding_id} of '{}' is not a storage binding",
                        object_type.name
                    ),
                });
            }
            return Ok(StoreLocation::External(self.external_store(binding).await?));
        }

        match self.catalog.get_default_storage_binding(object_type.id).await? {
            Some(binding) if binding.is_storage => {
                Ok(StoreLocation::External(self.external_store(binding).await?))
            }
            _ => Ok(StoreLocation::Platform),
        }
    }

    /// Map a platform row's `datasource_id` back to its storage binding
    pub async fn store_for_datasource(
        &self,
        object_type: &ObjectType,
        datasource_id: Uuid,
    ) -> Result<ExternalStore, EngineError> {
        let binding = self
            .storage_bindings(object_type)
            .await?
            .into_iter()
            .find(|b| b.datasource_id == datasource_id)
            .ok_or_else(|| EngineError::StorageInconsistency {
                object_type: object_type.name.clone(),
                datasource_id: datasource_id.to_string(),
            })?;
        self.external_store(binding).await
    }
}
