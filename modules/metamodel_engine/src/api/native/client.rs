//! Native client implementation - wraps domain services for in-process calls

use crate::contract::{
    DataSource, DatasourceApi, DialectInfo, EngineError, InstanceApi, InstanceData, InstancePage,
    LinkInstance, LinkType, ObjectType, QueryApi, SchemaApi, TableColumnInfo,
};
use crate::domain::{InstanceService, QueryEngine, SchemaService};
use crate::infra::datasource::ConnectionManager;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Caller-supplied bounds checked before a request reaches the services
#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    pub max_page_size: u64,
    pub max_query_depth: usize,
}

/// Native client implementation that directly calls the domain services
///
/// This client is used for in-process communication without HTTP overhead.
/// It is the boundary where page sizes and search depths are bounded.
#[derive(Clone)]
pub struct NativeClient {
    instances: Arc<InstanceService>,
    schema: Arc<SchemaService>,
    queries: Arc<QueryEngine>,
    connections: Arc<ConnectionManager>,
    limits: RequestLimits,
}

impl NativeClient {
    pub fn new(
        instances: Arc<InstanceService>,
        schema: Arc<SchemaService>,
        queries: Arc<QueryEngine>,
        connections: Arc<ConnectionManager>,
        limits: RequestLimits,
    ) -> Self {
        Self {
            instances,
            schema,
            queries,
            connections,
            limits,
        }
    }

    fn check_depth(&self, depth: usize) -> Result<(), EngineError> {
        if depth > self.limits.max_query_depth {
            return Err(EngineError::Validation {
                message: format!(
                    "depth {depth} exceeds the maximum of {}",
                    self.limits.max_query_depth
                ),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl InstanceApi for NativeClient {
    async fn create_instance(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
        properties: InstanceData,
    ) -> Result<InstanceData, EngineError> {
        self.instances
            .create(object_type, storage_binding_id, properties)
            .await
    }

    async fn update_instance(
        &self,
        object_type: &str,
        id: Uuid,
        storage_binding_id: Option<Uuid>,
        properties: InstanceData,
    ) -> Result<InstanceData, EngineError> {
        self.instances
            .update(object_type, id, storage_binding_id, properties)
            .await
    }

    async fn get_instance(&self, object_type: &str, id: Uuid) -> Result<InstanceData, EngineError> {
        self.instances.get(object_type, id).await
    }

    async fn list_instances(
        &self,
        object_type: &str,
        page: u64,
        page_size: u64,
        filters: InstanceData,
    ) -> Result<InstancePage, EngineError> {
        if page_size > self.limits.max_page_size {
            return Err(EngineError::Validation {
                message: format!(
                    "page_size {page_size} exceeds the maximum of {}",
                    self.limits.max_page_size
                ),
            });
        }
        self.instances
            .list(object_type, page, page_size, filters)
            .await
    }

    async fn delete_instance(&self, object_type: &str, id: Uuid) -> Result<(), EngineError> {
        self.instances.delete(object_type, id).await
    }

    async fn batch_delete_instances(
        &self,
        object_type: &str,
        ids: Vec<Uuid>,
    ) -> Result<(), EngineError> {
        self.instances.batch_delete(object_type, ids).await
    }
}

#[async_trait]
impl QueryApi for NativeClient {
    async fn find_type_paths(
        &self,
        source_type: &str,
        target_type: &str,
        max_depth: usize,
    ) -> Result<Vec<Vec<LinkType>>, EngineError> {
        self.check_depth(max_depth)?;
        self.queries
            .find_type_paths(source_type, target_type, max_depth)
            .await
    }

    async fn find_reachable_types(
        &self,
        object_type: &str,
        depth: usize,
    ) -> Result<Vec<ObjectType>, EngineError> {
        self.check_depth(depth)?;
        self.queries.find_reachable_types(object_type, depth).await
    }

    async fn find_link_types(&self, object_type: &str) -> Result<Vec<LinkType>, EngineError> {
        self.queries.find_link_types(object_type).await
    }

    async fn find_instance_paths(
        &self,
        source_instance: Uuid,
        target_instance: Uuid,
        max_depth: usize,
    ) -> Result<Vec<Vec<LinkInstance>>, EngineError> {
        self.check_depth(max_depth)?;
        self.queries
            .find_instance_paths(source_instance, target_instance, max_depth)
            .await
    }

    async fn find_neighbors(
        &self,
        instance_id: Uuid,
        link_type: Option<&str>,
    ) -> Result<Vec<Uuid>, EngineError> {
        self.queries.find_neighbors(instance_id, link_type).await
    }

    async fn find_related(&self, instance_id: Uuid, depth: usize) -> Result<Vec<Uuid>, EngineError> {
        self.check_depth(depth)?;
        self.queries.find_related(instance_id, depth).await
    }
}

#[async_trait]
impl SchemaApi for NativeClient {
    async fn ensure_instance_table(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
    ) -> Result<(), EngineError> {
        self.schema
            .ensure_table(object_type, storage_binding_id)
            .await
    }

    async fn instance_table_exists(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
    ) -> Result<bool, EngineError> {
        self.schema
            .table_exists(object_type, storage_binding_id)
            .await
    }

    async fn add_property_column(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
        property: &str,
    ) -> Result<(), EngineError> {
        self.schema
            .add_column(object_type, storage_binding_id, property)
            .await
    }

    async fn drop_property_column(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
        column: &str,
    ) -> Result<(), EngineError> {
        self.schema
            .drop_column(object_type, storage_binding_id, column)
            .await
    }

    async fn has_column_data(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
        column: &str,
    ) -> Result<bool, EngineError> {
        self.schema
            .has_column_data(object_type, storage_binding_id, column)
            .await
    }

    async fn drop_instance_table(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
    ) -> Result<(), EngineError> {
        self.schema
            .drop_table(object_type, storage_binding_id)
            .await
    }
}

#[async_trait]
impl DatasourceApi for NativeClient {
    fn supported_dialects(&self) -> Vec<DialectInfo> {
        self.connections.registry().supported_dialects()
    }

    async fn test_connection(&self, datasource: &DataSource) -> bool {
        self.connections.test_connection(datasource).await
    }

    async fn list_schemas(&self, datasource: &DataSource) -> Result<Vec<String>, EngineError> {
        self.connections.list_schemas(datasource).await
    }

    async fn list_tables(
        &self,
        datasource: &DataSource,
        schema: Option<&str>,
    ) -> Result<Vec<String>, EngineError> {
        self.connections.list_tables(datasource, schema).await
    }

    async fn list_columns(
        &self,
        datasource: &DataSource,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<TableColumnInfo>, EngineError> {
        self.connections
            .list_columns(datasource, schema, table)
            .await
    }
}
