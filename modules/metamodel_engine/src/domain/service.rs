//! Instance router - resolves the physical store of every instance operation

use super::ddl::StoreTarget;
use super::dml::{DmlBuilder, Predicate};
use super::repository::TypeCatalog;
use super::storage::{ExternalStore, PlatformStore, StorageResolver, StoreLocation};
use super::table_manager::DynamicTableManager;
use super::validation::{lookup, validate_instance, validate_partial};
use super::values::{id_value, normalize_row, timestamp_now, to_db_value};
use crate::contract::{
    is_reserved_column, EngineError, InstanceData, InstancePage, ObjectType, Property,
};
use crate::infra::datasource::sql::{self, row_int, row_text};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait, Value as DbValue};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Object type resolved for one request
struct TypeContext {
    object_type: ObjectType,
    properties: Vec<Property>,
    table: String,
}

/// Result of locating an existing instance
struct Located {
    location: StoreLocation,
    /// The instance row when discovery already read it
    row: Option<InstanceData>,
}

/// Domain service for instance storage
pub struct InstanceService {
    catalog: Arc<dyn TypeCatalog>,
    tables: Arc<DynamicTableManager>,
    resolver: Arc<StorageResolver>,
    platform: PlatformStore,
}

impl InstanceService {
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

    fn platform_conn(&self) -> &DatabaseConnection {
        &self.platform.conn
    }

    async fn context(&self, object_type_name: &str) -> Result<TypeContext, EngineError> {
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
        Ok(TypeContext {
            object_type,
            properties,
            table,
        })
    }

    // ===== Create =====

    pub async fn create(
        &self,
        object_type_name: &str,
        storage_binding_id: Option<Uuid>,
        payload: InstanceData,
    ) -> Result<InstanceData, EngineError> {
        let ctx = self.context(object_type_name).await?;
        validate_instance(&payload, &ctx.properties)?;

        let location = self
            .resolver
            .resolve_write(&ctx.object_type, storage_binding_id)
            .await?;
        let id = Uuid::new_v4();

        let created = match &location {
            StoreLocation::Platform => {
                let columns = new_row_columns(&self.platform.target, &ctx, id, &payload)?;
                self.tables
                    .ensure_table(self.platform_conn(), &self.platform.target, &ctx.table, &ctx.properties)
                    .await?;
                let txn = self
                    .platform_conn()
                    .begin()
                    .await
                    .map_err(|e| EngineError::database(location.label(), e))?;
                let row = self
                    .insert_in(&txn, &self.platform.target, &ctx, id, columns)
                    .await?;
                txn.commit()
                    .await
                    .map_err(|e| EngineError::database(location.label(), e))?;
                row
            }
            StoreLocation::External(store) => {
                let columns = new_row_columns(&store.target, &ctx, id, &payload)?;
                let connections = self.resolver.connections();
                let conn = connections.get_connection(&store.datasource).await?;
                let result = self.insert_external(&conn, store, &ctx, id, columns).await;
                connections.release(&store.datasource, conn).await;
                result?
            }
        };

        info!(
            object_type = %ctx.object_type.name,
            %id,
            store = location.label(),
            "instance created"
        );
        Ok(normalize_row(created, &ctx.properties))
    }

    async fn insert_external(
        &self,
        conn: &DatabaseConnection,
        store: &ExternalStore,
        ctx: &TypeContext,
        id: Uuid,
        columns: Vec<(String, DbValue)>,
    ) -> Result<InstanceData, EngineError> {
        self.tables
            .ensure_table(conn, &store.target, &ctx.table, &ctx.properties)
            .await?;
        self.insert_in(conn, &store.target, ctx, id, columns).await
    }

    /// Insert into a table that already exists
    async fn insert_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        target: &StoreTarget,
        ctx: &TypeContext,
        id: Uuid,
        columns: Vec<(String, DbValue)>,
    ) -> Result<InstanceData, EngineError> {
        let (names, values): (Vec<String>, Vec<DbValue>) = columns.into_iter().unzip();
        let dml = DmlBuilder::new(target, conn.get_database_backend());
        sql::execute(conn, &target.label, &dml.insert(&ctx.table, &names), values).await?;
        fetch_row(conn, target, &ctx.table, id)
            .await?
            .ok_or_else(|| EngineError::Internal(format!("instance {id} vanished after insert")))
    }

    // ===== Update =====

    pub async fn update(
        &self,
        object_type_name: &str,
        id: Uuid,
        storage_binding_id: Option<Uuid>,
        payload: InstanceData,
    ) -> Result<InstanceData, EngineError> {
        let ctx = self.context(object_type_name).await?;
        validate_partial(&payload, &ctx.properties)?;

        let location = match storage_binding_id {
            Some(_) => {
                self.resolver
                    .resolve_write(&ctx.object_type, storage_binding_id)
                    .await?
            }
            None => self.locate(&ctx, id, true).await?.location,
        };

        let updated = match &location {
            StoreLocation::Platform => {
                let columns = changed_columns(&self.platform.target, &ctx, &payload)?;
                self.tables
                    .ensure_table(self.platform_conn(), &self.platform.target, &ctx.table, &ctx.properties)
                    .await?;
                let txn = self
                    .platform_conn()
                    .begin()
                    .await
                    .map_err(|e| EngineError::database(location.label(), e))?;
                let row = update_in(&txn, &self.platform.target, &ctx, id, columns).await?;
                txn.commit()
                    .await
                    .map_err(|e| EngineError::database(location.label(), e))?;
                row
            }
            StoreLocation::External(store) => {
                let columns = changed_columns(&store.target, &ctx, &payload)?;
                let connections = self.resolver.connections();
                let conn = connections.get_connection(&store.datasource).await?;
                let result = self.update_external(&conn, store, &ctx, id, columns).await;
                connections.release(&store.datasource, conn).await;
                result?
            }
        };

        info!(
            object_type = %ctx.object_type.name,
            %id,
            store = location.label(),
            "instance updated"
        );
        Ok(normalize_row(updated, &ctx.properties))
    }

    async fn update_external(
        &self,
        conn: &DatabaseConnection,
        store: &ExternalStore,
        ctx: &TypeContext,
        id: Uuid,
        columns: Vec<(String, DbValue)>,
    ) -> Result<InstanceData, EngineError> {
        if !self.tables.table_exists(conn, &store.target, &ctx.table).await? {
            return Err(EngineError::not_found("instance", id));
        }
        self.tables
            .ensure_table(conn, &store.target, &ctx.table, &ctx.properties)
            .await?;
        update_in(conn, &store.target, ctx, id, columns).await
    }

    // ===== Get =====

    pub async fn get(&self, object_type_name: &str, id: Uuid) -> Result<InstanceData, EngineError> {
        let ctx = self.context(object_type_name).await?;
        let located = self.locate(&ctx, id, true).await?;

        let row = match (located.row, &located.location) {
            (Some(row), _) => Some(row),
            (None, StoreLocation::Platform) => None,
            (None, StoreLocation::External(store)) => {
                let connections = self.resolver.connections();
                let conn = connections.get_connection(&store.datasource).await?;
                let result = self.fetch_external(&conn, store, &ctx, id).await;
                connections.release(&store.datasource, conn).await;
                result?
            }
        };

        row.map(|row| normalize_row(row, &ctx.properties))
            .ok_or_else(|| EngineError::not_found("instance", id))
    }

    async fn fetch_external(
        &self,
        conn: &DatabaseConnection,
        store: &ExternalStore,
        ctx: &TypeContext,
        id: Uuid,
    ) -> Result<Option<InstanceData>, EngineError> {
        if !self.tables.table_exists(conn, &store.target, &ctx.table).await? {
            return Ok(None);
        }
        fetch_row(conn, &store.target, &ctx.table, id).await
    }

    /// Find the store holding an existing instance.
    ///
    /// The platform row decides when present: its `datasource_id` names the
    /// storage binding, a null one means the platform itself. Without a platform
    /// row every storage binding is scanned in priority order. An instance found
    /// nowhere is reported as living in the platform store.
    async fn locate(
        &self,
        ctx: &TypeContext,
        id: Uuid,
        create_platform_table: bool,
    ) -> Result<Located, EngineError> {
        let target = &self.platform.target;
        let conn = self.platform_conn();

        let mut platform_table = self.tables.table_exists(conn, target, &ctx.table).await?;
        if !platform_table && create_platform_table {
            self.tables
                .ensure_table(conn, target, &ctx.table, &ctx.properties)
                .await?;
            platform_table = true;
        }

        if platform_table {
            if let Some(row) = fetch_row(conn, target, &ctx.table, id).await? {
                return match row_text(&row, "datasource_id") {
                    Some(raw) => {
                        let datasource_id = Uuid::parse_str(&raw).map_err(|_| {
                            EngineError::StorageInconsistency {
                                object_type: ctx.object_type.name.clone(),
                                datasource_id: raw.clone(),
                            }
                        })?;
                        let store = self
                            .resolver
                            .store_for_datasource(&ctx.object_type, datasource_id)
                            .await?;
                        Ok(Located {
                            location: StoreLocation::External(store),
                            row: None,
                        })
                    }
                    None => Ok(Located {
                        location: StoreLocation::Platform,
                        row: Some(row),
                    }),
                };
            }
        }

        let connections = self.resolver.connections();
        for binding in self.resolver.storage_bindings(&ctx.object_type).await? {
            let store = self.resolver.external_store(binding).await?;
            let conn = connections.get_connection(&store.datasource).await?;
            let result = self.fetch_external(&conn, &store, ctx, id).await;
            connections.release(&store.datasource, conn).await;
            if let Some(row) = result? {
                debug!(%id, store = %store.target.label, "instance found in storage datasource");
                return Ok(Located {
                    location: StoreLocation::External(store),
                    row: Some(row),
                });
            }
        }

        Ok(Located {
            location: StoreLocation::Platform,
            row: None,
        })
    }

    // ===== List =====

    pub async fn list(
        &self,
        object_type_name: &str,
        page: u64,
        page_size: u64,
        filters: InstanceData,
    ) -> Result<InstancePage, EngineError> {
        if page < 1 || page_size < 1 {
            return Err(EngineError::Validation {
                message: "page and page_size must be at least 1".to_string(),
            });
        }
        let ctx = self.context(object_type_name).await?;
        let bindings = self.resolver.storage_bindings(&ctx.object_type).await?;
        let offset = (page - 1).saturating_mul(page_size);

        if bindings.is_empty() {
            return self.list_platform_page(&ctx, page, page_size, offset, &filters).await;
        }

        let platform_filter = filter_predicates(&self.platform.target, &ctx.properties, &filters)?;
        let mut stores = Vec::with_capacity(bindings.len());
        for binding in bindings {
            match self.resolver.external_store(binding).await {
                Ok(store) => {
                    let filter = filter_predicates(&store.target, &ctx.properties, &filters)?;
                    stores.push((store, filter));
                }
                Err(e) => {
                    warn!(object_type = %ctx.object_type.name, error = %e, "storage binding excluded from listing");
                }
            }
        }

        let mut records = list_all_in(
            self.platform_conn(),
            &self.tables,
            &self.platform.target,
            &ctx,
            platform_filter,
        )
        .await?;

        let connections = self.resolver.connections();
        for (store, filter) in stores {
            let conn = match connections.get_connection(&store.datasource).await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(store = %store.target.label, error = %e, "storage datasource excluded from listing");
                    continue;
                }
            };
            let result = list_all_in(&conn, &self.tables, &store.target, &ctx, filter).await;
            connections.release(&store.datasource, conn).await;
            match result {
                Ok(rows) => records.extend(rows),
                Err(e) => {
                    warn!(store = %store.target.label, error = %e, "storage datasource excluded from listing");
                }
            }
        }

        records.sort_by(|a, b| created_at(b).cmp(created_at(a)));
        let total = records.len() as u64;
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);
        let records = records.into_iter().skip(start).take(take).collect();

        Ok(InstancePage {
            records,
            total,
            page,
            page_size,
        })
    }

    async fn list_platform_page(
        &self,
        ctx: &TypeContext,
        page: u64,
        page_size: u64,
        offset: u64,
        filters: &InstanceData,
    ) -> Result<InstancePage, EngineError> {
        let conn = self.platform_conn();
        let target = &self.platform.target;
        let empty = InstancePage {
            records: Vec::new(),
            total: 0,
            page,
            page_size,
        };
        let (predicates, values) = filter_predicates(target, &ctx.properties, filters)?;
        if !self.tables.table_exists(conn, target, &ctx.table).await? {
            return Ok(empty);
        }

        let dml = DmlBuilder::new(target, conn.get_database_backend());
        let total = sql::query_one(conn, &target.label, &dml.count(&ctx.table, &predicates), values.clone())
            .await?
            .and_then(|row| row_int(&row, "total"))
            .unwrap_or(0);
        let rows = sql::query_rows(
            conn,
            &target.label,
            &dml.select(&ctx.table, &predicates, Some((page_size, offset))),
            values,
        )
        .await?;

        Ok(InstancePage {
            records: rows
                .into_iter()
                .map(|row| normalize_row(row, &ctx.properties))
                .collect(),
            total: u64::try_from(total).unwrap_or(0),
            ..empty
        })
    }

    // ===== Delete =====

    pub async fn delete(&self, object_type_name: &str, id: Uuid) -> Result<(), EngineError> {
        let ctx = self.context(object_type_name).await?;
        let located = self.locate(&ctx, id, false).await?;

        let deleted = match &located.location {
            StoreLocation::Platform => {
                delete_in(self.platform_conn(), &self.tables, &self.platform.target, &ctx.table, &[id])
                    .await?
            }
            StoreLocation::External(store) => {
                let connections = self.resolver.connections();
                let conn = connections.get_connection(&store.datasource).await?;
                let result = delete_in(&conn, &self.tables, &store.target, &ctx.table, &[id]).await;
                connections.release(&store.datasource, conn).await;
                result?
            }
        };

        match deleted {
            None => {
                debug!(object_type = %ctx.object_type.name, %id, "instance table absent, nothing to delete");
                Ok(())
            }
            Some(0) => Err(EngineError::not_found("instance", id)),
            Some(_) => {
                info!(
                    object_type = %ctx.object_type.name,
                    %id,
                    store = located.location.label(),
                    "instance deleted"
                );
                Ok(())
            }
        }
    }

    /// Delete many instances, grouped by the store each one lives in.
    ///
    /// Ids that match no row are skipped.
    pub async fn batch_delete(&self, object_type_name: &str, ids: Vec<Uuid>) -> Result<(), EngineError> {
        if ids.is_empty() {
            return Ok(());
        }
        let ctx = self.context(object_type_name).await?;

        let mut platform_ids = Vec::new();
        let mut external: Vec<(ExternalStore, Vec<Uuid>)> = Vec::new();
        for id in &ids {
            match self.locate(&ctx, *id, false).await?.location {
                StoreLocation::Platform => platform_ids.push(*id),
                StoreLocation::External(store) => {
                    match external
                        .iter_mut()
                        .find(|(s, _)| s.binding.id == store.binding.id)
                    {
                        Some((_, group)) => group.push(*id),
                        None => external.push((store, vec![*id])),
                    }
                }
            }
        }

        if !platform_ids.is_empty() {
            let txn = self
                .platform_conn()
                .begin()
                .await
                .map_err(|e| EngineError::database(&self.platform.target.label, e))?;
            delete_in(&txn, &self.tables, &self.platform.target, &ctx.table, &platform_ids).await?;
            txn.commit()
                .await
                .map_err(|e| EngineError::database(&self.platform.target.label, e))?;
        }

        let connections = self.resolver.connections();
        for (store, group) in external {
            let conn = connections.get_connection(&store.datasource).await?;
            let result = delete_in(&conn, &self.tables, &store.target, &ctx.table, &group).await;
            connections.release(&store.datasource, conn).await;
            result?;
        }

        info!(object_type = %ctx.object_type.name, count = ids.len(), "instances deleted");
        Ok(())
    }
}

// ===== Statement helpers =====

/// Columns for a new row: keys, audit timestamps and every supplied non-null property
fn new_row_columns(
    target: &StoreTarget,
    ctx: &TypeContext,
    id: Uuid,
    payload: &InstanceData,
) -> Result<Vec<(String, DbValue)>, EngineError> {
    let now = timestamp_now();
    let mut columns = vec![
        ("id".to_string(), id_value(target, id)),
        ("class_id".to_string(), id_value(target, ctx.object_type.id)),
        ("created_at".to_string(), now.into()),
        ("updated_at".to_string(), now.into()),
    ];
    columns.extend(property_columns(target, &ctx.properties, payload, false)?);
    Ok(columns)
}

/// `updated_at` plus every property the payload mentions, explicit nulls included
fn changed_columns(
    target: &StoreTarget,
    ctx: &TypeContext,
    payload: &InstanceData,
) -> Result<Vec<(String, DbValue)>, EngineError> {
    let mut columns = vec![("updated_at".to_string(), timestamp_now().into())];
    columns.extend(property_columns(target, &ctx.properties, payload, true)?);
    Ok(columns)
}

fn property_columns(
    target: &StoreTarget,
    properties: &[Property],
    payload: &InstanceData,
    keep_nulls: bool,
) -> Result<Vec<(String, DbValue)>, EngineError> {
    let mut columns = Vec::new();
    for property in properties {
        let column = property.column_name();
        if is_reserved_column(&column) {
            continue;
        }
        let Some((_, value)) = lookup(payload, &property.name) else {
            continue;
        };
        if value.is_null() && !keep_nulls {
            continue;
        }
        columns.push((column, to_db_value(target, property, value)?));
    }
    Ok(columns)
}

/// Equality predicates for filter keys naming a known property; null means `IS NULL`
fn filter_predicates(
    target: &StoreTarget,
    properties: &[Property],
    filters: &InstanceData,
) -> Result<(Vec<Predicate>, Vec<DbValue>), EngineError> {
    let mut predicates = Vec::new();
    let mut values = Vec::new();
    for (key, value) in filters {
        let Some(property) = properties.iter().find(|p| p.name.eq_ignore_ascii_case(key)) else {
            debug!(filter = %key, "filter key matches no property, ignored");
            continue;
        };
        let column = property.column_name();
        if is_reserved_column(&column) {
            continue;
        }
        if value.is_null() {
            predicates.push(Predicate::IsNull(column));
        } else {
            values.push(to_db_value(target, property, value)?);
            predicates.push(Predicate::Eq(column));
        }
    }
    Ok((predicates, values))
}

async fn fetch_row<C: ConnectionTrait>(
    conn: &C,
    target: &StoreTarget,
    table: &str,
    id: Uuid,
) -> Result<Option<InstanceData>, EngineError> {
    let dml = DmlBuilder::new(target, conn.get_database_backend());
    sql::query_one(conn, &target.label, &dml.select_by_id(table), vec![id_value(target, id)]).await
}

async fn update_in<C: ConnectionTrait>(
    conn: &C,
    target: &StoreTarget,
    ctx: &TypeContext,
    id: Uuid,
    columns: Vec<(String, DbValue)>,
) -> Result<InstanceData, EngineError> {
    let (names, mut values): (Vec<String>, Vec<DbValue>) = columns.into_iter().unzip();
    values.push(id_value(target, id));
    let dml = DmlBuilder::new(target, conn.get_database_backend());
    let affected = sql::execute(conn, &target.label, &dml.update(&ctx.table, &names), values).await?;
    if affected == 0 {
        return Err(EngineError::not_found("instance", id));
    }
    fetch_row(conn, target, &ctx.table, id)
        .await?
        .ok_or_else(|| EngineError::not_found("instance", id))
}

/// Rows deleted, or `None` when the table does not exist
async fn delete_in<C: ConnectionTrait>(
    conn: &C,
    tables: &DynamicTableManager,
    target: &StoreTarget,
    table: &str,
    ids: &[Uuid],
) -> Result<Option<u64>, EngineError> {
    if !tables.table_exists(conn, target, table).await? {
        return Ok(None);
    }
    let dml = DmlBuilder::new(target, conn.get_database_backend());
    let values = ids.iter().map(|id| id_value(target, *id)).collect();
    let affected = sql::execute(conn, &target.label, &dml.delete_by_ids(table, ids.len()), values).await?;
    Ok(Some(affected))
}

/// Every matching row of one store, normalized; a missing table lists nothing
async fn list_all_in<C: ConnectionTrait>(
    conn: &C,
    tables: &DynamicTableManager,
    target: &StoreTarget,
    ctx: &TypeContext,
    (predicates, values): (Vec<Predicate>, Vec<DbValue>),
) -> Result<Vec<InstanceData>, EngineError> {
    if !tables.table_exists(conn, target, &ctx.table).await? {
        return Ok(Vec::new());
    }
    let dml = DmlBuilder::new(target, conn.get_database_backend());
    let rows = sql::query_rows(conn, &target.label, &dml.select(&ctx.table, &predicates, None), values).await?;
    Ok(rows
        .into_iter()
        .map(|row| normalize_row(row, &ctx.properties))
        .collect())
}

fn created_at(row: &InstanceData) -> &str {
    row.get("created_at").and_then(Value::as_str).unwrap_or("")
}
