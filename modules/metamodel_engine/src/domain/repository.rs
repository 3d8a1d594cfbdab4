//! Repository traits for data access
//!
//! These traits define the read accessors the engine consumes from the type catalog
//! and the link instance store. The engine never mutates catalog records.
//! Implementations are in infra/storage/repositories.rs and infra/memory.rs

use crate::contract::{
    BusinessDomain, DataSource, LinkInstance, LinkType, ObjectType, Property, StorageBinding,
};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Read accessors over object types, properties, link types and storage bindings
#[async_trait]
pub trait TypeCatalog: Send + Sync {
    async fn get_object_type_by_name(&self, name: &str) -> Result<Option<ObjectType>>;

    async fn get_object_type(&self, id: Uuid) -> Result<Option<ObjectType>>;

    async fn get_domain(&self, id: Uuid) -> Result<Option<BusinessDomain>>;

    /// Properties ordered by `sort_order`
    async fn get_properties_by_object_type_id(&self, object_type_id: Uuid)
        -> Result<Vec<Property>>;

    /// Link types where the object type is source or target
    async fn get_link_types_by_object_type_id(&self, object_type_id: Uuid)
        -> Result<Vec<LinkType>>;

    async fn get_link_type_by_name(&self, name: &str) -> Result<Option<LinkType>>;

    async fn get_storage_bindings_by_object_type_id(
        &self,
        object_type_id: Uuid,
    ) -> Result<Vec<StorageBinding>>;

    /// The binding with `is_storage` and `is_default` both set
    async fn get_default_storage_binding(
        &self,
        object_type_id: Uuid,
    ) -> Result<Option<StorageBinding>>;

    async fn get_datasource(&self, id: Uuid) -> Result<Option<DataSource>>;
}

/// Read accessor over data-level links
#[async_trait]
pub trait LinkInstanceRepository: Send + Sync {
    /// Links where the instance is source or target
    async fn find_by_instance(&self, instance_id: Uuid) -> Result<Vec<LinkInstance>>;
}
