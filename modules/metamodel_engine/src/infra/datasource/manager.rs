//! Resolves datasource records to live, scoped connections

use super::connector::DialectConnector;
use super::introspect;
use super::registry::ConnectorRegistry;
use crate::contract::{DataSource, EngineError, TableColumnInfo};
use crate::infra::secret::SecretCipher;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

pub struct ConnectionManager {
    registry: Arc<ConnectorRegistry>,
    cipher: Arc<dyn SecretCipher>,
    connect_timeout: Duration,
    validation_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        cipher: Arc<dyn SecretCipher>,
        connect_timeout: Duration,
        validation_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            cipher,
            connect_timeout,
            validation_timeout,
        }
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    pub fn connector_for(
        &self,
        datasource: &DataSource,
    ) -> Result<Arc<dyn DialectConnector>, EngineError> {
        self.registry.get(&datasource.dialect)
    }

    /// Open a connection; the caller owns it and must [`release`](Self::release) it
    pub async fn get_connection(
        &self,
        datasource: &DataSource,
    ) -> Result<DatabaseConnection, EngineError> {
        let connector = self.connector_for(datasource)?;
        let password = match datasource.password.as_deref().filter(|p| !p.is_empty()) {
            Some(stored) => Some(self.cipher.reveal(stored).map_err(|_| {
                EngineError::connection(&datasource.code, "stored credentials could not be decrypted")
            })?),
            None => None,
        };
        connector
            .create_connection(datasource, password.as_deref(), self.connect_timeout)
            .await
    }

    /// Close a connection obtained from [`get_connection`](Self::get_connection)
    pub async fn release(&self, datasource: &DataSource, conn: DatabaseConnection) {
        if let Err(e) = conn.close().await {
            tracing::warn!(datasource = %datasource.code, error = %e, "failed to close connection");
        }
    }

    /// Open, validate liveness within the validation timeout, close
    pub async fn test_connection(&self, datasource: &DataSource) -> bool {
        let conn = match self.get_connection(datasource).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(datasource = %datasource.code, error = %e, "connection test failed");
                return false;
            }
        };
        let alive = matches!(
            tokio::time::timeout(self.validation_timeout, conn.ping()).await,
            Ok(Ok(()))
        );
        self.release(datasource, conn).await;
        if !alive {
            tracing::warn!(datasource = %datasource.code, "connection test failed: ping");
        }
        alive
    }

    pub async fn list_tables(
        &self,
        datasource: &DataSource,
        schema: Option<&str>,
    ) -> Result<Vec<String>, EngineError> {
        let connector = self.connector_for(datasource)?;
        let conn = self.get_connection(datasource).await?;
        let result =
            introspect::list_tables(&conn, connector.as_ref(), &datasource.code, schema).await;
        self.release(datasource, conn).await;
        result
    }

    pub async fn list_columns(
        &self,
        datasource: &DataSource,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<TableColumnInfo>, EngineError> {
        let connector = self.connector_for(datasource)?;
        let conn = self.get_connection(datasource).await?;
        let result =
            introspect::list_columns(&conn, connector.as_ref(), &datasource.code, schema, table)
                .await;
        self.release(datasource, conn).await;
        result
    }

    pub async fn list_schemas(&self, datasource: &DataSource) -> Result<Vec<String>, EngineError> {
        let connector = self.connector_for(datasource)?;
        if connector.schemas_query().is_none() {
            return Err(EngineError::UnsupportedOperation {
                operation: "list_schemas".to_string(),
                dialect: connector.code().to_string(),
            });
        }
        let conn = self.get_connection(datasource).await?;
        let result = introspect::list_schemas(&conn, connector.as_ref(), &datasource.code).await;
        self.release(datasource, conn).await;
        result
    }
}
