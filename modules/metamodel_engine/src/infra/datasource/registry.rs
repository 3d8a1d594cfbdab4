//! Dialect code -> connector lookup, populated once at startup

use super::connector::DialectConnector;
use super::dialects::{
    GenericConnector, MySqlConnector, OracleConnector, PostgresConnector, SqlServerConnector,
    SqliteConnector,
};
use crate::contract::{DialectInfo, EngineError};
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only after construction; share it behind an `Arc`
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<String, Arc<dyn DialectConnector>>,
}

impl ConnectorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in dialect
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PostgresConnector));
        registry.register(Arc::new(MySqlConnector::mysql()));
        registry.register(Arc::new(MySqlConnector::mariadb()));
        registry.register(Arc::new(SqliteConnector));
        registry.register(Arc::new(SqlServerConnector));
        registry.register(Arc::new(OracleConnector));
        registry.register(Arc::new(GenericConnector));
        registry
    }

    /// Add a connector under its code; a later registration replaces an earlier one
    pub fn register(&mut self, connector: Arc<dyn DialectConnector>) {
        let code = connector.code().to_ascii_uppercase();
        if let Some(previous) = self.connectors.insert(code.clone(), connector) {
            tracing::warn!(
                dialect = %code,
                replaced = previous.display_name(),
                "dialect connector replaced"
            );
        } else {
            tracing::debug!(dialect = %code, "dialect connector registered");
        }
    }

    pub fn get(&self, code: &str) -> Result<Arc<dyn DialectConnector>, EngineError> {
        self.connectors
            .get(&code.trim().to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| EngineError::UnsupportedDialect {
                code: code.to_string(),
                supported: self.supported_types(),
            })
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.connectors
            .contains_key(&code.trim().to_ascii_uppercase())
    }

    /// Registered dialect codes, sorted
    pub fn supported_types(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.connectors.keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn supported_dialects(&self) -> Vec<DialectInfo> {
        let mut infos: Vec<DialectInfo> = self.connectors.values().map(|c| c.info()).collect();
        infos.sort_by(|a, b| a.code.cmp(&b.code));
        infos
    }
}
