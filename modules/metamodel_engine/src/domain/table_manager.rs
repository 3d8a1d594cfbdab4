//! Dynamic table manager: executes instance-table DDL against any store

use super::ddl::{instance_table_name, DdlBuilder, StoreTarget};
use super::repository::TypeCatalog;
use crate::contract::{is_reserved_column, EngineError, ObjectType, Property};
use crate::infra::datasource::{introspect, sql};
use sea_orm::ConnectionTrait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct DynamicTableManager {
    catalog: Arc<dyn TypeCatalog>,
}

impl DynamicTableManager {
    pub fn new(catalog: Arc<dyn TypeCatalog>) -> Self {
        Self { catalog }
    }

    /// Physical table name for an object type.
    ///
    /// A dangling domain reference falls back to the default prefix.
    pub async fn table_name(&self, object_type: &ObjectType) -> Result<String, EngineError> {
        let domain_code = match object_type.domain_id {
            Some(domain_id) => match self.catalog.get_domain(domain_id).await? {
                Some(domain) => Some(domain.code),
                None => {
                    warn!(
                        object_type = %object_type.name,
                        %domain_id,
                        "business domain not found, using default table prefix"
                    );
                    None
                }
            },
            None => None,
        };
        instance_table_name(domain_code.as_deref(), &object_type.name)
    }

    pub async fn table_exists<C: ConnectionTrait>(
        &self,
        conn: &C,
        target: &StoreTarget,
        table: &str,
    ) -> Result<bool, EngineError> {
        introspect::table_exists(
            conn,
            target.connector.as_ref(),
            &target.label,
            target.schema(),
            table,
        )
        .await
    }

    /// Create the table with one column per property.
    ///
    /// When the create statement fails but the table is present afterwards,
    /// another writer created it first and the call succeeds. Call it outside
    /// a transaction, the presence check reuses `conn`.
    pub async fn create_table<C: ConnectionTrait>(
        &self,
        conn: &C,
        target: &StoreTarget,
        table: &str,
        properties: &[Property],
    ) -> Result<(), EngineError> {
        let statements = DdlBuilder::new(target).create_table(table, properties)?;
        let mut statements = statements.iter();

        if let Some(create) = statements.next() {
            if let Err(err) = sql::execute(conn, &target.label, create, vec![]).await {
                if self.table_exists(conn, target, table).await.unwrap_or(false) {
                    debug!(store = %target.label, table, "table created concurrently");
                } else {
                    return Err(err);
                }
            }
        }
        for index in statements {
            if let Err(err) = sql::execute(conn, &target.label, index, vec![]).await {
                warn!(store = %target.label, table, error = %err, "index creation failed");
            }
        }
        info!(store = %target.label, table, "instance table created");
        Ok(())
    }

    /// Create the table if absent, otherwise add the property columns it lacks.
    ///
    /// Columns added here to a populated table are nullable unless they carry a
    /// default; required-ness is still enforced on every write.
    pub async fn ensure_table<C: ConnectionTrait>(
        &self,
        conn: &C,
        target: &StoreTarget,
        table: &str,
        properties: &[Property],
    ) -> Result<(), EngineError> {
        if !self.table_exists(conn, target, table).await? {
            return self.create_table(conn, target, table, properties).await;
        }

        let existing = introspect::column_names(
            conn,
            target.connector.as_ref(),
            &target.label,
            target.schema(),
            table,
        )
        .await?;
        let builder = DdlBuilder::new(target);
        for property in properties {
            let column = property.column_name();
            if existing.contains(&column) || is_reserved_column(&column) {
                continue;
            }
            let mut relaxed = property.clone();
            relaxed.required = property.required && property.default_value.is_some();
            if let Some(ddl) = builder.add_column(table, &relaxed)? {
                sql::execute(conn, &target.label, &ddl, vec![]).await?;
                info!(store = %target.label, table, column, "column added");
            }
        }
        Ok(())
    }

    /// `ALTER TABLE ... ADD COLUMN`; a column that already exists is left alone
    pub async fn add_column<C: ConnectionTrait>(
        &self,
        conn: &C,
        target: &StoreTarget,
        table: &str,
        property: &Property,
    ) -> Result<(), EngineError> {
        let Some(ddl) = DdlBuilder::new(target).add_column(table, property)? else {
            return Ok(());
        };
        if !target.connector.supports_column_if_exists() {
            let existing = introspect::column_names(
                conn,
                target.connector.as_ref(),
                &target.label,
                target.schema(),
                table,
            )
            .await?;
            if existing.contains(&property.column_name()) {
                debug!(store = %target.label, table, column = %property.column_name(), "column exists");
                return Ok(());
            }
        }
        sql::execute(conn, &target.label, &ddl, vec![]).await?;
        info!(store = %target.label, table, column = %property.column_name(), "column added");
        Ok(())
    }

    /// Drop a property column; refused while any row holds a value in it
    pub async fn drop_column<C: ConnectionTrait>(
        &self,
        conn: &C,
        target: &StoreTarget,
        table: &str,
        column: &str,
    ) -> Result<(), EngineError> {
        let column = column.to_lowercase();
        if is_reserved_column(&column) {
            return Err(EngineError::Validation {
                message: format!("system column '{column}' cannot be dropped"),
            });
        }
        let existing = introspect::column_names(
            conn,
            target.connector.as_ref(),
            &target.label,
            target.schema(),
            table,
        )
        .await?;
        if !existing.contains(&column) {
            debug!(store = %target.label, table, column, "column absent, nothing to drop");
            return Ok(());
        }
        if column_holds_data(conn, target, table, &column).await? {
            return Err(EngineError::Conflict {
                reason: format!("column '{column}' of table '{table}' still holds data"),
            });
        }
        let ddl = DdlBuilder::new(target).drop_column(table, &column);
        sql::execute(conn, &target.label, &ddl, vec![]).await?;
        info!(store = %target.label, table, column, "column dropped");
        Ok(())
    }

    /// Whether any row holds a value in the column; a missing column holds none
    pub async fn has_column_data<C: ConnectionTrait>(
        &self,
        conn: &C,
        target: &StoreTarget,
        table: &str,
        column: &str,
    ) -> Result<bool, EngineError> {
        let column = column.to_lowercase();
        let existing = introspect::column_names(
            conn,
            target.connector.as_ref(),
            &target.label,
            target.schema(),
            table,
        )
        .await?;
        if !existing.contains(&column) {
            return Ok(false);
        }
        column_holds_data(conn, target, table, &column).await
    }

    pub async fn drop_table<C: ConnectionTrait>(
        &self,
        conn: &C,
        target: &StoreTarget,
        table: &str,
    ) -> Result<(), EngineError> {
        let ddl = DdlBuilder::new(target).drop_table(table);
        sql::execute(conn, &target.label, &ddl, vec![]).await?;
        info!(store = %target.label, table, "instance table dropped");
        Ok(())
    }
}

async fn column_holds_data<C: ConnectionTrait>(
    conn: &C,
    target: &StoreTarget,
    table: &str,
    column: &str,
) -> Result<bool, EngineError> {
    let query = DdlBuilder::new(target).column_data_query(table, column);
    Ok(sql::query_one(conn, &target.label, &query, vec![])
        .await?
        .is_some())
}
