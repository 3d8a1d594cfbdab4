//! Entity to model mappers
//!
//! Conversions between SeaORM entities and contract models

use super::entity;
use crate::contract::{
    BusinessDomain, DataSource, DataType, LinkInstance, LinkType, ObjectType, Property,
    StorageBinding,
};

impl From<entity::business_domain::Model> for BusinessDomain {
    fn from(entity: entity::business_domain::Model) -> Self {
        Self {
            id: entity.id,
            code: entity.code,
            name: entity.name,
        }
    }
}

impl From<entity::object_type::Model> for ObjectType {
    fn from(entity: entity::object_type::Model) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            domain_id: entity.domain_id,
            primary_key_field_name: entity.primary_key_field_name,
        }
    }
}

impl From<entity::property::Model> for Property {
    fn from(entity: entity::property::Model) -> Self {
        Self {
            id: entity.id,
            object_type_id: entity.object_type_id,
            data_type: entity.data_type.parse().unwrap_or(DataType::Other),
            name: entity.name,
            required: entity.required,
            default_value: entity.default_value,
            sort_order: entity.sort_order,
        }
    }
}

impl From<entity::datasource::Model> for DataSource {
    fn from(entity: entity::datasource::Model) -> Self {
        let port = entity.port.and_then(|p| match u16::try_from(p) {
            Ok(port) => Some(port),
            Err(_) => {
                tracing::warn!(datasource = %entity.code, port = p, "port out of range, ignored");
                None
            }
        });
        Self {
            id: entity.id,
            code: entity.code,
            name: entity.name,
            dialect: entity.dialect,
            host: entity.host,
            port,
            database_name: entity.database_name,
            schema_name: entity.schema_name,
            username: entity.username,
            password: entity.password,
            connection_url: entity.connection_url,
            enabled: entity.enabled,
            status: entity.status,
        }
    }
}

impl From<entity::storage_binding::Model> for StorageBinding {
    fn from(entity: entity::storage_binding::Model) -> Self {
        Self {
            id: entity.id,
            object_type_id: entity.object_type_id,
            datasource_id: entity.datasource_id,
            table_name: entity.table_name,
            schema_name: entity.schema_name,
            is_storage: entity.is_storage,
            is_default: entity.is_default,
            priority: entity.priority,
        }
    }
}

impl From<entity::link_type::Model> for LinkType {
    fn from(entity: entity::link_type::Model) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            source_object_type_id: entity.source_object_type_id,
            target_object_type_id: entity.target_object_type_id,
            cardinality: entity.cardinality,
            bidirectional: entity.bidirectional,
        }
    }
}

impl From<entity::link_instance::Model> for LinkInstance {
    fn from(entity: entity::link_instance::Model) -> Self {
        Self {
            id: entity.id,
            link_type_id: entity.link_type_id,
            source_instance_id: entity.source_instance_id,
            target_instance_id: entity.target_instance_id,
            properties: entity.properties,
        }
    }
}
