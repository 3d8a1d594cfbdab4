//! SeaORM repository implementations

use crate::contract::{
    BusinessDomain, DataSource, LinkInstance, LinkType, ObjectType, Property, StorageBinding,
};
use crate::domain::repository::{LinkInstanceRepository, TypeCatalog};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use uuid::Uuid;

use super::entity::{
    business_domain, datasource, link_instance, link_type, object_type, property, storage_binding,
};

// ===== Type Catalog =====

pub struct SeaOrmTypeCatalog {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmTypeCatalog {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TypeCatalog for SeaOrmTypeCatalog {
    async fn get_object_type_by_name(&self, name: &str) -> Result<Option<ObjectType>> {
        let found = object_type::Entity::find()
            .filter(object_type::Column::Name.eq(name))
            .one(&*self.db)
            .await?;
        Ok(found.map(Into::into))
    }

    async fn get_object_type(&self, id: Uuid) -> Result<Option<ObjectType>> {
        Ok(object_type::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .map(Into::into))
    }

    async fn get_domain(&self, id: Uuid) -> Result<Option<BusinessDomain>> {
        Ok(business_domain::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .map(Into::into))
    }

    async fn get_properties_by_object_type_id(&self, object_type_id: Uuid) -> Result<Vec<Property>> {
        let rows = property::Entity::find()
            .filter(property::Column::ObjectTypeId.eq(object_type_id))
            .order_by_asc(property::Column::SortOrder)
            .order_by_asc(property::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_link_types_by_object_type_id(&self, object_type_id: Uuid) -> Result<Vec<LinkType>> {
        let rows = link_type::Entity::find()
            .filter(
                Condition::any()
                    .add(link_type::Column::SourceObjectTypeId.eq(object_type_id))
                    .add(link_type::Column::TargetObjectTypeId.eq(object_type_id)),
            )
            .order_by_asc(link_type::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_link_type_by_name(&self, name: &str) -> Result<Option<LinkType>> {
        Ok(link_type::Entity::find()
            .filter(link_type::Column::Name.eq(name))
            .one(&*self.db)
            .await?
            .map(Into::into))
    }

    async fn get_storage_bindings_by_object_type_id(
        &self,
        object_type_id: Uuid,
    ) -> Result<Vec<StorageBinding>> {
        let rows = storage_binding::Entity::find()
            .filter(storage_binding::Column::ObjectTypeId.eq(object_type_id))
            .order_by_desc(storage_binding::Column::Priority)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_default_storage_binding(&self, object_type_id: Uuid) -> Result<Option<StorageBinding>> {
        Ok(storage_binding::Entity::find()
            .filter(storage_binding::Column::ObjectTypeId.eq(object_type_id))
            .filter(storage_binding::Column::IsStorage.eq(true))
            .filter(storage_binding::Column::IsDefault.eq(true))
            .order_by_desc(storage_binding::Column::Priority)
            .one(&*self.db)
            .await?
            .map(Into::into))
    }

    async fn get_datasource(&self, id: Uuid) -> Result<Option<DataSource>> {
        Ok(datasource::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .map(Into::into))
    }
}

// ===== Link Instance Repository =====

pub struct SeaOrmLinkInstanceRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmLinkInstanceRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LinkInstanceRepository for SeaOrmLinkInstanceRepository {
    async fn find_by_instance(&self, instance_id: Uuid) -> Result<Vec<LinkInstance>> {
        let rows = link_instance::Entity::find()
            .filter(
                Condition::any()
                    .add(link_instance::Column::SourceInstanceId.eq(instance_id))
                    .add(link_instance::Column::TargetInstanceId.eq(instance_id)),
            )
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
