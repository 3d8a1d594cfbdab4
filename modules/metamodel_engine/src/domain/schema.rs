//! Instance-table administration for one object type in one store

use super::ddl::StoreTarget;
use super::repository::TypeCatalog;
use super::storage::{PlatformStore, StorageResolver, StoreLocation};
use super::table_manager::DynamicTableManager;
use crate::contract::{EngineError, ObjectType, Property};
use sea_orm::ConnectionTrait;
use std::sync::Arc;
use uuid::Uuid;

enum TableOp<'a> {
    Ensure,
    Exists,
    AddColumn(&'a str),
    DropColumn(&'a str),
    HasColumnData(&'a str),
    Drop,
}

/// Table operations addressed by object type name.
///
/// `storage_binding_id` selects a storage datasource; `None` addresses the platform store.
pub struct SchemaService {
    catalog: Arc<dyn TypeCatalog>,
    tables: Arc<DynamicTableManager>,
    resolver: Arc<StorageResolver>,
    platform: PlatformStore,
}

impl SchemaService {
    pub fn new(
        catalog: Arc<dyn TypeCatalog>,
        tables: Arc<DynamicTableManager>,
        resolver: Arc<StorageResolver>,
        platform: PlatformStore,
    ) -> Self {
        Self {
            catalog,
            tables,
            resolver,
            platform,
        }
    }

    /// Create the instance table, or add the property columns it lacks
    pub async fn ensure_table(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
    ) -> Result<(), EngineError> {
        self.execute(object_type, storage_binding_id, TableOp::Ensure)
            .await
            .map(drop)
    }

    pub async fn table_exists(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
    ) -> Result<bool, EngineError> {
        self.execute(object_type, storage_binding_id, TableOp::Exists)
            .await
    }

    /// Add the column backing a catalog property
    pub async fn add_column(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
        property: &str,
    ) -> Result<(), EngineError> {
        self.execute(object_type, storage_binding_id, TableOp::AddColumn(property))
            .await
            .map(drop)
    }

    /// Drop a property column; `Conflict` while any row holds a value in it
    pub async fn drop_column(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
        column: &str,
    ) -> Result<(), EngineError> {
        self.execute(object_type, storage_binding_id, TableOp::DropColumn(column))
            .await
            .map(drop)
    }

    pub async fn has_column_data(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
        column: &str,
    ) -> Result<bool, EngineError> {
        self.execute(object_type, storage_binding_id, TableOp::HasColumnData(column))
            .await
    }

    pub async fn drop_table(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
    ) -> Result<(), EngineError> {
        self.execute(object_type, storage_binding_id, TableOp::Drop)
            .await
            .map(drop)
    }

    async fn execute(
        &self,
        object_type_name: &str,
        storage_binding_id: Option<Uuid>,
        op: TableOp<'_>,
    ) -> Result<bool, EngineError> {
        let object_type = self
            .catalog
            .get_object_type_by_name(object_type_name)
            .await?
            .ok_or_else(|| EngineError::not_found("object_type", object_type_name))?;
        let properties = self
            .catalog
            .get_properties_by_object_type_id(object_type.id)
            .await?;
        let table = self.tables.table_name(&object_type).await?;

        match self.location(&object_type, storage_binding_id).await? {
            StoreLocation::Platform => {
                self.run(
                    self.platform.conn.as_ref(),
                    &self.platform.target,
                    &table,
                    &properties,
                    op,
                )
                .await
            }
            StoreLocation::External(store) => {
                let connections = self.resolver.connections();
                let conn = connections.get_connection(&store.datasource).await?;
                let result = self
                    .run(&conn, &store.target, &table, &properties, op)
                    .await;
                connections.release(&store.datasource, conn).await;
                result
            }
        }
    }

    async fn location(
        &self,
        object_type: &ObjectType,
        storage_binding_id: Option<Uuid>,
    ) -> Result<StoreLocation, EngineError> {
        match storage_binding_id {
            Some(_) => {
                self.resolver
                    .resolve_write(object_type, storage_binding_id)
                    .await
            }
            None => Ok(StoreLocation::Platform),
        }
    }

    async fn run<C: ConnectionTrait>(
        &self,
        conn: &C,
        target: &StoreTarget,
        table: &str,
        properties: &[Property],
        op: TableOp<'_>,
    ) -> Result<bool, EngineError> {
        let tables = &self.tables;
        match op {
            TableOp::Ensure => tables.ensure_table(conn, target, table, properties).await?,
            TableOp::Exists => return tables.table_exists(conn, target, table).await,
            TableOp::AddColumn(name) => {
                let property = properties
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(name))
                    .ok_or_else(|| EngineError::not_found("property", name))?;
                if !tables.table_exists(conn, target, table).await? {
                    return tables
                        .create_table(conn, target, table, properties)
                        .await
                        .map(|()| true);
                }
                tables.add_column(conn, target, table, property).await?
            }
            TableOp::DropColumn(column) => {
                if tables.table_exists(conn, target, table).await? {
                    tables.drop_column(conn, target, table, column).await?
                }
            }
            TableOp::HasColumnData(column) => {
                if !tables.table_exists(conn, target, table).await? {
                    return Ok(false);
                }
                return tables.has_column_data(conn, target, table, column).await;
            }
            TableOp::Drop => tables.drop_table(conn, target, table).await?,
        }
        Ok(true)
    }
}
