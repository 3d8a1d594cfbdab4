//! Integration tests for datasource connectivity and introspection

mod common;

use common::{person, sqlite_datasource, TestEngine};
use metamodel_engine::contract::{DatasourceApi, EngineError, ErrorKind, InstanceApi};

#[tokio::test]
async fn builtin_dialects_are_listed_in_code_order() {
    let env = TestEngine::new().await;
    let codes: Vec<String> = env
        .client()
        .supported_dialects()
        .into_iter()
        .map(|d| d.code)
        .collect();

    for expected in ["MYSQL", "POSTGRESQL", "SQLITE"] {
        assert!(codes.contains(&expected.to_string()), "{codes:?}");
    }
    let mut sorted = codes.clone();
    sorted.sort();
    assert_eq!(codes, sorted);
}

#[tokio::test]
async fn test_connection_reports_failures_as_false() {
    let env = TestEngine::new().await;
    let client = env.client();

    let good = env.add_sqlite_datasource("good", "good.db");
    assert!(client.test_connection(&good).await);

    let mut no_database = sqlite_datasource("empty", "");
    no_database.database_name = None;
    assert!(!client.test_connection(&no_database).await);

    let mut unknown = sqlite_datasource("db2", "x.db");
    unknown.dialect = "DB2".to_string();
    assert!(!client.test_connection(&unknown).await);

    let unreachable = sqlite_datasource(
        "unreachable",
        &env.db_path("no/such/dir/x.db").display().to_string(),
    );
    assert!(!client.test_connection(&unreachable).await);
}

#[tokio::test]
async fn introspection_sees_instance_tables() {
    let env = TestEngine::new().await;
    let person_type = env.person_type();
    let ds = env.add_sqlite_datasource("store", "store.db");
    env.bind_storage(&person_type, &ds, true, 0);
    let client = env.client();

    client
        .create_instance("person", None, person("Ada", 36))
        .await
        .unwrap();

    let tables = client.list_tables(&ds, None).await.unwrap();
    assert_eq!(tables, vec!["default_person".to_string()]);

    let columns = client
        .list_columns(&ds, None, "default_person")
        .await
        .unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.column_name.as_str()).collect();
    for expected in ["id", "class_id", "created_at", "updated_at", "name", "age", "active"] {
        assert!(names.contains(&expected), "{names:?}");
    }
    let id = columns.iter().find(|c| c.column_name == "id").unwrap();
    assert!(id.primary_key);
    let name = columns.iter().find(|c| c.column_name == "name").unwrap();
    assert!(!name.primary_key);
    assert!(!name.nullable);
    let age = columns.iter().find(|c| c.column_name == "age").unwrap();
    assert!(age.nullable);
}

#[tokio::test]
async fn schemas_are_unsupported_on_sqlite() {
    let env = TestEngine::new().await;
    let ds = env.add_sqlite_datasource("store", "store.db");

    let err = env.client().list_schemas(&ds).await.unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedOperation { ref dialect, .. } if dialect == "SQLITE"));
}

#[tokio::test]
async fn unknown_dialect_is_reported_as_not_found() {
    let env = TestEngine::new().await;
    let mut ds = sqlite_datasource("db2", "x.db");
    ds.dialect = "DB2".to_string();

    let err = env.client().list_tables(&ds, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(matches!(err, EngineError::UnsupportedDialect { .. }));
}

#[tokio::test]
async fn undecryptable_password_is_a_connection_error() {
    let env = TestEngine::new().await;
    let mut ds = env.add_sqlite_datasource("sealed", "sealed.db");
    ds.password = Some("ENC:not-a-sealed-secret".to_string());
    let client = env.client();

    let err = client.list_tables(&ds, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(matches!(
        err,
        EngineError::Connection { ref datasource, ref message }
            if datasource == "sealed" && message.contains("decrypted")
    ));
    assert!(!client.test_connection(&ds).await);
}
