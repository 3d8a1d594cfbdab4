//! Native client traits for inter-module communication
//!
//! These traits define the API that other modules use to interact with the metamodel engine.
//! NO HTTP - direct function calls for performance.

use super::{
    error::EngineError,
    model::{
        DataSource, DialectInfo, InstanceData, InstancePage, LinkInstance, LinkType, ObjectType,
        TableColumnInfo,
    },
};
use async_trait::async_trait;
use uuid::Uuid;

/// Instance storage API
#[async_trait]
pub trait InstanceApi: Send + Sync {
    /// Create an instance, optionally in the store named by a storage binding
    async fn create_instance(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
        properties: InstanceData,
    ) -> Result<InstanceData, EngineError>;

    /// Update the properties present in the payload; absent properties are kept
    async fn update_instance(
        &self,
        object_type: &str,
        id: Uuid,
        storage_binding_id: Option<Uuid>,
        properties: InstanceData,
    ) -> Result<InstanceData, EngineError>;

    async fn get_instance(&self, object_type: &str, id: Uuid)
        -> Result<InstanceData, EngineError>;

    /// List instances across every bound store, newest first. `page` is 1-based.
    async fn list_instances(
        &self,
        object_type: &str,
        page: u64,
        page_size: u64,
        filters: InstanceData,
    ) -> Result<InstancePage, EngineError>;

    async fn delete_instance(&self, object_type: &str, id: Uuid) -> Result<(), EngineError>;

    async fn batch_delete_instances(
        &self,
        object_type: &str,
        ids: Vec<Uuid>,
    ) -> Result<(), EngineError>;
}

/// Graph query API over the model and instance link graphs
#[async_trait]
pub trait QueryApi: Send + Sync {
    // ===== Model level =====

    /// Every simple path of link types between two object types
    async fn find_type_paths(
        &self,
        source_type: &str,
        target_type: &str,
        max_depth: usize,
    ) -> Result<Vec<Vec<LinkType>>, EngineError>;

    /// Object types reachable within `depth` hops, origin excluded
    async fn find_reachable_types(
        &self,
        object_type: &str,
        depth: usize,
    ) -> Result<Vec<ObjectType>, EngineError>;

    /// Link types touching an object type as source or target
    async fn find_link_types(&self, object_type: &str) -> Result<Vec<LinkType>, EngineError>;

    // ===== Instance level =====

    async fn find_instance_paths(
        &self,
        source_instance: Uuid,
        target_instance: Uuid,
        max_depth: usize,
    ) -> Result<Vec<Vec<LinkInstance>>, EngineError>;

    async fn find_neighbors(
        &self,
        instance_id: Uuid,
        link_type: Option<&str>,
    ) -> Result<Vec<Uuid>, EngineError>;

    /// Instances reachable within `depth` hops, origin excluded
    async fn find_related(&self, instance_id: Uuid, depth: usize)
        -> Result<Vec<Uuid>, EngineError>;
}

/// Instance-table administration API.
///
/// `storage_binding_id` addresses a storage datasource; `None` addresses the platform store.
#[async_trait]
pub trait SchemaApi: Send + Sync {
    /// Create the instance table, or add the property columns it lacks
    async fn ensure_instance_table(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
    ) -> Result<(), EngineError>;

    async fn instance_table_exists(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
    ) -> Result<bool, EngineError>;

    async fn add_property_column(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
        property: &str,
    ) -> Result<(), EngineError>;

    /// Refused with `Conflict` while any row holds a value in the column
    async fn drop_property_column(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
        column: &str,
    ) -> Result<(), EngineError>;

    async fn has_column_data(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
        column: &str,
    ) -> Result<bool, EngineError>;

    async fn drop_instance_table(
        &self,
        object_type: &str,
        storage_binding_id: Option<Uuid>,
    ) -> Result<(), EngineError>;
}

/// Datasource connectivity and introspection API
#[async_trait]
pub trait DatasourceApi: Send + Sync {
    fn supported_dialects(&self) -> Vec<DialectInfo>;

    /// Open, ping and close; failures are reported as `false`
    async fn test_connection(&self, datasource: &DataSource) -> bool;

    async fn list_schemas(&self, datasource: &DataSource) -> Result<Vec<String>, EngineError>;

    async fn list_tables(
        &self,
        datasource: &DataSource,
        schema: Option<&str>,
    ) -> Result<Vec<String>, EngineError>;

    async fn list_columns(
        &self,
        datasource: &DataSource,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<TableColumnInfo>, EngineError>;
}
