//! Common test utilities: a SQLite-backed engine over an in-memory catalog

#![allow(dead_code)]

use metamodel_engine::contract::{
    BusinessDomain, DataSource, DataType, InstanceData, LinkType, ObjectType, Property,
    StorageBinding,
};
use metamodel_engine::infra::memory::{InMemoryLinkStore, InMemoryTypeCatalog};
use metamodel_engine::{Config, MetamodelEngine, NativeClient};
use sea_orm::Database;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// Engine whose platform store and datasources are SQLite files in a temp dir
pub struct TestEngine {
    pub dir: TempDir,
    pub catalog: InMemoryTypeCatalog,
    pub links: InMemoryLinkStore,
    pub engine: MetamodelEngine,
    sort_order: AtomicI32,
}

impl TestEngine {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("platform.db").display());
        let mut config = Config {
            platform_database_url: url.clone(),
            run_migrations: false,
            secret_passphrase: "test-passphrase".to_string(),
            ..Config::default()
        };
        adjust(&mut config);

        let platform = Arc::new(Database::connect(url).await.unwrap());
        let catalog = InMemoryTypeCatalog::new();
        let links = InMemoryLinkStore::new();
        let engine = MetamodelEngine::assemble(
            &config,
            platform,
            Arc::new(catalog.clone()),
            Arc::new(links.clone()),
        )
        .unwrap();

        Self {
            dir,
            catalog,
            links,
            engine,
            sort_order: AtomicI32::new(0),
        }
    }

    pub fn client(&self) -> Arc<NativeClient> {
        self.engine.client()
    }

    pub fn db_path(&self, file: &str) -> PathBuf {
        self.dir.path().join(file)
    }

    pub fn add_object_type(&self, name: &str, domain_id: Option<Uuid>) -> ObjectType {
        let object_type = ObjectType {
            id: Uuid::new_v4(),
            name: name.to_string(),
            domain_id,
            primary_key_field_name: None,
        };
        self.catalog.add_object_type(object_type.clone()).unwrap();
        object_type
    }

    pub fn add_domain(&self, code: &str) -> BusinessDomain {
        let domain = BusinessDomain {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: code.to_string(),
        };
        self.catalog.add_domain(domain.clone()).unwrap();
        domain
    }

    pub fn add_property(
        &self,
        object_type: &ObjectType,
        name: &str,
        data_type: DataType,
        required: bool,
    ) -> Property {
        let sort_order = self.next_sort_order();
        let property = Property {
            id: Uuid::new_v4(),
            object_type_id: object_type.id,
            name: name.to_string(),
            data_type,
            required,
            default_value: None,
            sort_order,
        };
        self.catalog.add_property(property.clone()).unwrap();
        property
    }

    fn next_sort_order(&self) -> i32 {
        self.sort_order.fetch_add(1, Ordering::Relaxed)
    }

    /// `person` with a required `name`, an `age` and an `active` flag
    pub fn person_type(&self) -> ObjectType {
        let person = self.add_object_type("person", None);
        self.add_property(&person, "name", DataType::String, true);
        self.add_property(&person, "age", DataType::Integer, false);
        self.add_property(&person, "active", DataType::Boolean, false);
        person
    }

    /// SQLite datasource stored in `file` under the temp dir
    pub fn add_sqlite_datasource(&self, code: &str, file: &str) -> DataSource {
        let datasource = sqlite_datasource(code, &self.db_path(file).display().to_string());
        self.catalog.add_datasource(datasource.clone()).unwrap();
        datasource
    }

    pub fn bind_storage(
        &self,
        object_type: &ObjectType,
        datasource: &DataSource,
        is_default: bool,
        priority: i32,
    ) -> StorageBinding {
        let binding = StorageBinding {
            id: Uuid::new_v4(),
            object_type_id: object_type.id,
            datasource_id: datasource.id,
            table_name: None,
            schema_name: None,
            is_storage: true,
            is_default,
            priority,
        };
        self.catalog.add_storage_binding(binding.clone()).unwrap();
        binding
    }

    pub fn add_link_type(&self, name: &str, source: &ObjectType, target: &ObjectType) -> LinkType {
        let link_type = LinkType {
            id: Uuid::new_v4(),
            name: name.to_string(),
            source_object_type_id: source.id,
            target_object_type_id: target.id,
            cardinality: "MANY_TO_ONE".to_string(),
            bidirectional: false,
        };
        self.catalog.add_link_type(link_type.clone()).unwrap();
        link_type
    }
}

pub fn sqlite_datasource(code: &str, path: &str) -> DataSource {
    DataSource {
        id: Uuid::new_v4(),
        code: code.to_string(),
        name: code.to_string(),
        dialect: "SQLITE".to_string(),
        host: None,
        port: None,
        database_name: Some(path.to_string()),
        schema_name: None,
        username: None,
        password: None,
        connection_url: None,
        enabled: true,
        status: None,
    }
}

/// Build an instance payload from a JSON object literal
pub fn payload(value: Value) -> InstanceData {
    match value {
        Value::Object(map) => map,
        other => panic!("payload must be a JSON object, got {other}"),
    }
}

pub fn person(name: &str, age: i64) -> InstanceData {
    payload(json!({ "name": name, "age": age }))
}

pub fn id_of(record: &InstanceData) -> Uuid {
    Uuid::parse_str(record["id"].as_str().unwrap()).unwrap()
}
