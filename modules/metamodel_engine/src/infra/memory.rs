//! In-memory type catalog and link store
//!
//! Used when the catalog is administered elsewhere and handed to the engine at
//! startup, and by tests. Registration methods enforce the catalog's uniqueness
//! and storage-binding rules.

use crate::contract::{
    BusinessDomain, DataSource, EngineError, LinkInstance, LinkType, ObjectType, Property,
    StorageBinding,
};
use crate::domain::repository::{LinkInstanceRepository, TypeCatalog};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
struct CatalogState {
    domains: HashMap<Uuid, BusinessDomain>,
    object_types: HashMap<Uuid, ObjectType>,
    properties: HashMap<Uuid, Vec<Property>>,
    link_types: Vec<LinkType>,
    datasources: HashMap<Uuid, DataSource>,
    bindings: Vec<StorageBinding>,
}

#[derive(Clone, Default)]
pub struct InMemoryTypeCatalog {
    state: Arc<RwLock<CatalogState>>,
}

fn conflict(reason: String) -> EngineError {
    EngineError::Conflict { reason }
}

impl InMemoryTypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_domain(&self, domain: BusinessDomain) -> Result<(), EngineError> {
        let mut state = self.state.write();
        if state.domains.values().any(|d| d.code == domain.code) {
            return Err(conflict(format!("business domain code '{}' exists", domain.code)));
        }
        state.domains.insert(domain.id, domain);
        Ok(())
    }

    pub fn add_object_type(&self, object_type: ObjectType) -> Result<(), EngineError> {
        let mut state = self.state.write();
        if state.object_types.values().any(|t| t.name == object_type.name) {
            return Err(conflict(format!("object type '{}' exists", object_type.name)));
        }
        state.object_types.insert(object_type.id, object_type);
        Ok(())
    }

    pub fn add_property(&self, property: Property) -> Result<(), EngineError> {
        let mut state = self.state.write();
        if !state.object_types.contains_key(&property.object_type_id) {
            return Err(EngineError::not_found("object_type", property.object_type_id));
        }
        let properties = state.properties.entry(property.object_type_id).or_default();
        if properties.iter().any(|p| p.name == property.name) {
            return Err(conflict(format!("property '{}' exists", property.name)));
        }
        properties.push(property);
        properties.sort_by_key(|p| p.sort_order);
        Ok(())
    }

    pub fn add_datasource(&self, datasource: DataSource) -> Result<(), EngineError> {
        let mut state = self.state.write();
        if state.datasources.values().any(|d| d.code == datasource.code) {
            return Err(conflict(format!("datasource code '{}' exists", datasource.code)));
        }
        state.datasources.insert(datasource.id, datasource);
        Ok(())
    }

    /// Register a binding.
    ///
    /// Non-storage bindings need a table name, a datasource is bound as storage at
    /// most once per object type, and a new default replaces the previous default
    /// of the same kind.
    pub fn add_storage_binding(&self, binding: StorageBinding) -> Result<(), EngineError> {
        let mut state = self.state.write();
        if !state.object_types.contains_key(&binding.object_type_id) {
            return Err(EngineError::not_found("object_type", binding.object_type_id));
        }
        if !state.datasources.contains_key(&binding.datasource_id) {
            return Err(EngineError::not_found("datasource", binding.datasource_id));
        }
        if !binding.is_storage
            && binding
                .table_name
                .as_deref()
                .map_or(true, |t| t.trim().is_empty())
        {
            return Err(EngineError::Validation {
                message: "a non-storage binding requires a table name".to_string(),
            });
        }
        if binding.is_storage
            && state.bindings.iter().any(|b| {
                b.is_storage
                    && b.object_type_id == binding.object_type_id
                    && b.datasource_id == binding.datasource_id
            })
        {
            return Err(conflict(format!(
                "datasource {} is already storage for object type {}",
                binding.datasource_id, binding.object_type_id
            )));
        }
        if binding.is_default {
            for existing in state.bindings.iter_mut().filter(|b| {
                b.object_type_id == binding.object_type_id && b.is_storage == binding.is_storage
            }) {
                existing.is_default = false;
            }
        }
        state.bindings.push(binding);
        Ok(())
    }

    pub fn remove_storage_binding(&self, id: Uuid) {
        self.state.write().bindings.retain(|b| b.id != id);
    }

    pub fn add_link_type(&self, link_type: LinkType) -> Result<(), EngineError> {
        let mut state = self.state.write();
        if state.link_types.iter().any(|l| l.name == link_type.name) {
            return Err(conflict(format!("link type '{}' exists", link_type.name)));
        }
        for endpoint in [link_type.source_object_type_id, link_type.target_object_type_id] {
            if !state.object_types.contains_key(&endpoint) {
                return Err(EngineError::not_found("object_type", endpoint));
            }
        }
        state.link_types.push(link_type);
        Ok(())
    }
}

#[async_trait]
impl TypeCatalog for InMemoryTypeCatalog {
    async fn get_object_type_by_name(&self, name: &str) -> Result<Option<ObjectType>> {
        Ok(self
            .state
            .read()
            .object_types
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn get_object_type(&self, id: Uuid) -> Result<Option<ObjectType>> {
        Ok(self.state.read().object_types.get(&id).cloned())
    }

    async fn get_domain(&self, id: Uuid) -> Result<Option<BusinessDomain>> {
        Ok(self.state.read().domains.get(&id).cloned())
    }

    async fn get_properties_by_object_type_id(&self, object_type_id: Uuid) -> Result<Vec<Property>> {
        Ok(self
            .state
            .read()
            .properties
            .get(&object_type_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_link_types_by_object_type_id(&self, object_type_id: Uuid) -> Result<Vec<LinkType>> {
        Ok(self
            .state
            .read()
            .link_types
            .iter()
            .filter(|l| {
                l.source_object_type_id == object_type_id
                    || l.target_object_type_id == object_type_id
            })
            .cloned()
            .collect())
    }

    async fn get_link_type_by_name(&self, name: &str) -> Result<Option<LinkType>> {
        Ok(self
            .state
            .read()
            .link_types
            .iter()
            .find(|l| l.name == name)
            .cloned())
    }

    async fn get_storage_bindings_by_object_type_id(
        &self,
        object_type_id: Uuid,
    ) -> Result<Vec<StorageBinding>> {
        Ok(self
            .state
            .read()
            .bindings
            .iter()
            .filter(|b| b.object_type_id == object_type_id)
            .cloned()
            .collect())
    }

    async fn get_default_storage_binding(&self, object_type_id: Uuid) -> Result<Option<StorageBinding>> {
        Ok(self
            .state
            .read()
            .bindings
            .iter()
            .find(|b| b.object_type_id == object_type_id && b.is_storage && b.is_default)
            .cloned())
    }

    async fn get_datasource(&self, id: Uuid) -> Result<Option<DataSource>> {
        Ok(self.state.read().datasources.get(&id).cloned())
    }
}

/// Link instances keyed by id
#[derive(Clone, Default)]
pub struct InMemoryLinkStore {
    links: Arc<RwLock<HashMap<Uuid, LinkInstance>>>,
}

impl InMemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_link(&self, link: LinkInstance) {
        self.links.write().insert(link.id, link);
    }

    pub fn remove_link(&self, id: Uuid) {
        self.links.write().remove(&id);
    }
}

#[async_trait]
impl LinkInstanceRepository for InMemoryLinkStore {
    async fn find_by_instance(&self, instance_id: Uuid) -> Result<Vec<LinkInstance>> {
        let mut links: Vec<LinkInstance> = self
            .links
            .read()
            .values()
            .filter(|l| l.source_instance_id == instance_id || l.target_instance_id == instance_id)
            .cloned()
            .collect();
        links.sort_by_key(|l| l.id);
        Ok(links)
    }
}
