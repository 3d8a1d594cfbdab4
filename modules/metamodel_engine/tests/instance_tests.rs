//! Integration tests for instance storage across the platform and external stores

mod common;

use common::{id_of, payload, person, TestEngine};
use metamodel_engine::contract::{
    DataType, EngineError, ErrorKind, InstanceApi, SchemaApi, StorageBinding,
};
use metamodel_engine::DatasourceApi;
use sea_orm::ConnectionTrait;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

async fn tick() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

#[tokio::test]
async fn create_then_get_round_trips_in_platform_store() {
    let env = TestEngine::new().await;
    env.person_type();
    let client = env.client();

    let created = client
        .create_instance("person", None, payload(json!({"name": "Ada", "age": 36, "active": true})))
        .await
        .unwrap();

    assert_eq!(created["name"], json!("Ada"));
    assert_eq!(created["age"], json!(36));
    assert_eq!(created["active"], json!(true));
    assert!(created.get("class_id").is_none());
    assert!(created["created_at"].as_str().is_some());

    let id = id_of(&created);
    let fetched = client.get_instance("person", id).await.unwrap();
    assert_eq!(fetched["name"], json!("Ada"));
    assert_eq!(fetched["age"], json!(36));
    assert_eq!(fetched["created_at"], created["created_at"]);
    assert!(fetched.get("class_id").is_none());
}

#[tokio::test]
async fn first_writers_racing_on_a_new_table_both_succeed() {
    let env = TestEngine::new().await;
    env.person_type();
    let client = env.client();

    let (first, second) = tokio::join!(
        client.create_instance("person", None, person("Ada", 36)),
        client.create_instance("person", None, person("Bob", 40)),
    );
    first.unwrap();
    second.unwrap();

    let listed = client
        .list_instances("person", 1, 10, Default::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 2);

    let updated = client
        .update_instance("person", id_of(&listed.records[0]), None, payload(json!({"age": 50})))
        .await
        .unwrap();
    assert_eq!(updated["age"], json!(50));
}

#[tokio::test]
async fn table_name_carries_domain_prefix() {
    let env = TestEngine::new().await;
    let crm = env.add_domain("CRM");
    let lead = env.add_object_type("Sales Lead", Some(crm.id));
    env.add_property(&lead, "title", DataType::String, true);
    let ds = env.add_sqlite_datasource("leads", "leads.db");
    env.bind_storage(&lead, &ds, true, 0);

    env.client()
        .create_instance("Sales Lead", None, payload(json!({"title": "Acme"})))
        .await
        .unwrap();

    let tables = env.client().list_tables(&ds, None).await.unwrap();
    assert!(tables.contains(&"crm_sales_lead".to_string()), "{tables:?}");
}

#[tokio::test]
async fn required_properties_match_keys_case_insensitively() {
    let env = TestEngine::new().await;
    env.person_type();
    let client = env.client();

    let created = client
        .create_instance("person", None, payload(json!({"NAME": "Bob"})))
        .await
        .unwrap();
    assert_eq!(created["name"], json!("Bob"));

    let err = client
        .create_instance("person", None, payload(json!({"age": 3})))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::MissingRequiredField { ref property } if property == "name"));

    let err = client
        .create_instance("person", None, payload(json!({"name": "   "})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn mistyped_values_are_rejected_before_writing() {
    let env = TestEngine::new().await;
    env.person_type();
    let client = env.client();

    let err = client
        .create_instance("person", None, payload(json!({"name": "Eve", "age": "old"})))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPropertyType { ref property, .. } if property == "age"));

    let page = client
        .list_instances("person", 1, 10, Default::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn unknown_object_type_is_not_found() {
    let env = TestEngine::new().await;
    let err = env
        .client()
        .create_instance("ghost", None, person("x", 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn update_keeps_absent_properties() {
    let env = TestEngine::new().await;
    env.person_type();
    let client = env.client();

    let created = client
        .create_instance("person", None, person("Grace", 30))
        .await
        .unwrap();
    let id = id_of(&created);
    tick().await;

    let updated = client
        .update_instance("person", id, None, payload(json!({"age": 31})))
        .await
        .unwrap();
    assert_eq!(updated["name"], json!("Grace"));
    assert_eq!(updated["age"], json!(31));
    assert_eq!(updated["created_at"], created["created_at"]);
    assert!(updated["updated_at"].as_str().unwrap() > created["updated_at"].as_str().unwrap());

    let cleared = client
        .update_instance("person", id, None, payload(json!({"age": null})))
        .await
        .unwrap();
    assert!(cleared["age"].is_null());

    let err = client
        .update_instance("person", id, None, payload(json!({"name": null})))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::MissingRequiredField { .. }));
}

#[tokio::test]
async fn update_of_unknown_instance_is_not_found() {
    let env = TestEngine::new().await;
    env.person_type();
    let err = env
        .client()
        .update_instance("person", Uuid::new_v4(), None, payload(json!({"age": 1})))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { ref resource, .. } if resource == "instance"));
}

#[tokio::test]
async fn delete_reports_missing_rows_but_not_missing_tables() {
    let env = TestEngine::new().await;
    env.person_type();
    let client = env.client();

    // never written: no table, nothing to delete
    client.delete_instance("person", Uuid::new_v4()).await.unwrap();

    let created = client
        .create_instance("person", None, person("Alan", 41))
        .await
        .unwrap();
    let id = id_of(&created);

    client.delete_instance("person", id).await.unwrap();
    let err = client.get_instance("person", id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = client.delete_instance("person", id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn writes_follow_default_then_explicit_binding() {
    let env = TestEngine::new().await;
    let person_type = env.person_type();
    let ds_a = env.add_sqlite_datasource("store_a", "a.db");
    let ds_b = env.add_sqlite_datasource("store_b", "b.db");
    env.bind_storage(&person_type, &ds_a, true, 10);
    let binding_b = env.bind_storage(&person_type, &ds_b, false, 5);
    let client = env.client();

    let in_a = client
        .create_instance("person", None, person("Ada", 36))
        .await
        .unwrap();
    let in_b = client
        .create_instance("person", Some(binding_b.id), person("Bob", 22))
        .await
        .unwrap();

    assert!(client
        .list_tables(&ds_a, None)
        .await
        .unwrap()
        .contains(&"default_person".to_string()));
    assert!(client
        .list_tables(&ds_b, None)
        .await
        .unwrap()
        .contains(&"default_person".to_string()));

    assert_eq!(
        client.get_instance("person", id_of(&in_a)).await.unwrap()["name"],
        json!("Ada")
    );
    assert_eq!(
        client.get_instance("person", id_of(&in_b)).await.unwrap()["name"],
        json!("Bob")
    );

    let updated = client
        .update_instance("person", id_of(&in_b), None, payload(json!({"age": 23})))
        .await
        .unwrap();
    assert_eq!(updated["age"], json!(23));
    assert_eq!(updated["name"], json!("Bob"));
}

#[tokio::test]
async fn explicit_binding_must_belong_to_type_and_be_storage() {
    let env = TestEngine::new().await;
    let person_type = env.person_type();
    let ds = env.add_sqlite_datasource("legacy", "legacy.db");
    let mapping = StorageBinding {
        id: Uuid::new_v4(),
        object_type_id: person_type.id,
        datasource_id: ds.id,
        table_name: Some("legacy_people".to_string()),
        schema_name: None,
        is_storage: false,
        is_default: false,
        priority: 0,
    };
    env.catalog.add_storage_binding(mapping.clone()).unwrap();
    let client = env.client();

    let err = client
        .create_instance("person", Some(Uuid::new_v4()), person("x", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { ref resource, .. } if resource == "storage_binding"));

    let err = client
        .create_instance("person", Some(mapping.id), person("x", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));
}

#[tokio::test]
async fn listing_merges_every_store_newest_first() {
    let env = TestEngine::new().await;
    let person_type = env.person_type();
    let ds_a = env.add_sqlite_datasource("store_a", "a.db");
    let ds_b = env.add_sqlite_datasource("store_b", "b.db");
    let binding_a = env.bind_storage(&person_type, &ds_a, true, 10);
    let binding_b = env.bind_storage(&person_type, &ds_b, false, 5);
    let client = env.client();

    let mut expected = Vec::new();
    for (i, binding) in [binding_a.id, binding_b.id, binding_a.id, binding_b.id, binding_a.id]
        .into_iter()
        .enumerate()
    {
        let created = client
            .create_instance("person", Some(binding), person(&format!("p{i}"), i as i64))
            .await
            .unwrap();
        expected.push(id_of(&created));
        tick().await;
    }
    expected.reverse();

    let first = client
        .list_instances("person", 1, 2, Default::default())
        .await
        .unwrap();
    assert_eq!(first.total, 5);
    assert_eq!(first.records.iter().map(id_of).collect::<Vec<_>>(), expected[0..2]);

    let last = client
        .list_instances("person", 3, 2, Default::default())
        .await
        .unwrap();
    assert_eq!(last.total, 5);
    assert_eq!(last.records.iter().map(id_of).collect::<Vec<_>>(), expected[4..5]);

    let beyond = client
        .list_instances("person", 4, 2, Default::default())
        .await
        .unwrap();
    assert!(beyond.records.is_empty());
    assert_eq!(beyond.total, 5);

    let filtered = client
        .list_instances("person", 1, 10, payload(json!({"name": "p3"})))
        .await
        .unwrap();
    assert_eq!(filtered.total, 1);
    assert_eq!(filtered.records[0]["name"], json!("p3"));
}

#[tokio::test]
async fn listing_unions_platform_rows_with_non_default_stores() {
    let env = TestEngine::new().await;
    let person_type = env.person_type();
    let ds_b = env.add_sqlite_datasource("store_b", "b.db");
    let ds_c = env.add_sqlite_datasource("store_c", "c.db");
    let binding_b = env.bind_storage(&person_type, &ds_b, false, 10);
    let binding_c = env.bind_storage(&person_type, &ds_c, false, 5);
    let client = env.client();

    // no default binding, so unaddressed writes stay on the platform
    let targets = [
        None,
        Some(binding_b.id),
        Some(binding_c.id),
        None,
        Some(binding_c.id),
        Some(binding_b.id),
        None,
    ];
    let mut expected = Vec::new();
    for (i, target) in targets.into_iter().enumerate() {
        let created = client
            .create_instance("person", target, person(&format!("p{i}"), i as i64))
            .await
            .unwrap();
        expected.push(id_of(&created));
        tick().await;
    }
    expected.reverse();

    let mut seen = Vec::new();
    for page in 1..=3 {
        let listed = client
            .list_instances("person", page, 3, Default::default())
            .await
            .unwrap();
        assert_eq!(listed.total, 7);
        seen.extend(listed.records.iter().map(id_of));
    }
    assert_eq!(seen, expected);

    let middle = client
        .list_instances("person", 2, 3, Default::default())
        .await
        .unwrap();
    assert_eq!(middle.records.iter().map(id_of).collect::<Vec<_>>(), expected[3..6]);

    let on_platform = client
        .list_instances("person", 1, 10, payload(json!({"name": "p3"})))
        .await
        .unwrap();
    assert_eq!(on_platform.total, 1);
    assert_eq!(on_platform.records[0]["name"], json!("p3"));
}

#[tokio::test]
async fn invalid_filter_fails_with_and_without_bindings() {
    let env = TestEngine::new().await;
    let person_type = env.person_type();
    let client = env.client();
    client
        .create_instance("person", None, person("Ada", 36))
        .await
        .unwrap();

    let bad_filter = || payload(json!({"age": "abc"}));
    let platform_only = client
        .list_instances("person", 1, 10, bad_filter())
        .await
        .unwrap_err();
    assert!(matches!(
        platform_only,
        EngineError::InvalidPropertyType { ref property, .. } if property == "age"
    ));

    let ds = env.add_sqlite_datasource("store", "store.db");
    let binding = env.bind_storage(&person_type, &ds, true, 0);
    client
        .create_instance("person", Some(binding.id), person("Bob", 40))
        .await
        .unwrap();

    let multi_store = client
        .list_instances("person", 1, 10, bad_filter())
        .await
        .unwrap_err();
    assert_eq!(multi_store.kind(), platform_only.kind());
    assert!(matches!(
        multi_store,
        EngineError::InvalidPropertyType { ref property, .. } if property == "age"
    ));

    let fine = client
        .list_instances("person", 1, 10, payload(json!({"age": 40})))
        .await
        .unwrap();
    assert_eq!(fine.total, 1);
    assert_eq!(fine.records[0]["name"], json!("Bob"));
}

#[tokio::test]
async fn platform_listing_pages_in_the_database() {
    let env = TestEngine::new().await;
    env.person_type();
    let client = env.client();

    let empty = client
        .list_instances("person", 1, 10, Default::default())
        .await
        .unwrap();
    assert_eq!(empty.total, 0);

    for i in 0..3 {
        client
            .create_instance("person", None, person(&format!("p{i}"), i))
            .await
            .unwrap();
        tick().await;
    }

    let page = client
        .list_instances("person", 1, 2, Default::default())
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.records[0]["name"], json!("p2"));
    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 2);
}

#[tokio::test]
async fn unreachable_datasource_is_excluded_from_listing() {
    let env = TestEngine::new().await;
    let person_type = env.person_type();
    let ds_a = env.add_sqlite_datasource("store_a", "a.db");
    let broken = env.add_sqlite_datasource("broken", "missing-dir/broken.db");
    let binding_a = env.bind_storage(&person_type, &ds_a, true, 10);
    env.bind_storage(&person_type, &broken, false, 1);
    let client = env.client();

    client
        .create_instance("person", Some(binding_a.id), person("Ada", 36))
        .await
        .unwrap();

    let page = client
        .list_instances("person", 1, 10, Default::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0]["name"], json!("Ada"));
}

#[tokio::test]
async fn page_bounds_are_validated() {
    let env = TestEngine::with_config(|config| config.max_page_size = 50).await;
    env.person_type();
    let client = env.client();

    for (page, size) in [(0, 10), (1, 0), (1, 51)] {
        let err = client
            .list_instances("person", page, size, Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }), "page {page} size {size}");
    }
}

#[tokio::test]
async fn batch_delete_spans_stores() {
    let env = TestEngine::new().await;
    let person_type = env.person_type();
    let ds_a = env.add_sqlite_datasource("store_a", "a.db");
    let binding_a = env.bind_storage(&person_type, &ds_a, false, 10);
    let client = env.client();

    let mut ids = Vec::new();
    for (i, binding) in [None, Some(binding_a.id), None, Some(binding_a.id)]
        .into_iter()
        .enumerate()
    {
        let created = client
            .create_instance("person", binding, person(&format!("p{i}"), i as i64))
            .await
            .unwrap();
        ids.push(id_of(&created));
    }
    let keep = client
        .create_instance("person", Some(binding_a.id), person("keep", 9))
        .await
        .unwrap();

    let mut doomed = ids.clone();
    doomed.push(Uuid::new_v4());
    client.batch_delete_instances("person", doomed).await.unwrap();

    for id in ids {
        assert_eq!(
            client.get_instance("person", id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
    let page = client
        .list_instances("person", 1, 10, Default::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(id_of(&page.records[0]), id_of(&keep));

    client.batch_delete_instances("person", Vec::new()).await.unwrap();
}

#[tokio::test]
async fn platform_row_naming_unbound_datasource_is_inconsistent() {
    let env = TestEngine::new().await;
    env.person_type();
    let client = env.client();

    let created = client
        .create_instance("person", None, person("Ada", 36))
        .await
        .unwrap();
    let id = id_of(&created);

    env.engine
        .platform()
        .execute_unprepared(&format!(
            "UPDATE default_person SET datasource_id = '{}' WHERE id = '{id}'",
            Uuid::new_v4()
        ))
        .await
        .unwrap();

    let err = client.get_instance("person", id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageInconsistency);

    let page = client
        .list_instances("person", 1, 10, Default::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn new_properties_reach_existing_tables_lazily() {
    let env = TestEngine::new().await;
    let person_type = env.person_type();
    let client = env.client();

    client
        .create_instance("person", None, person("Ada", 36))
        .await
        .unwrap();

    // required without default: the added column is nullable
    env.add_property(&person_type, "email", DataType::String, true);
    let created = client
        .create_instance("person", None, payload(json!({"name": "Bob", "email": "bob@example.com"})))
        .await
        .unwrap();
    assert_eq!(created["email"], json!("bob@example.com"));
    assert!(client.has_column_data("person", None, "email").await.unwrap());
}
