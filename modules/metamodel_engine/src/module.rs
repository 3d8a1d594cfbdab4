//! Engine bootstrap: connects the platform store, runs migrations and wires services

use crate::api::native::{NativeClient, RequestLimits};
use crate::config::Config;
use crate::domain::{
    DynamicTableManager, InstanceService, LinkInstanceRepository, PlatformStore, QueryEngine,
    SchemaService, StorageResolver, TypeCatalog,
};
use crate::infra::datasource::{ConnectionManager, ConnectorRegistry};
use crate::infra::secret::AesGcmSecretCipher;
use crate::infra::storage::{SeaOrmLinkInstanceRepository, SeaOrmTypeCatalog};
use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Fully wired metamodel engine
pub struct MetamodelEngine {
    platform: Arc<DatabaseConnection>,
    connections: Arc<ConnectionManager>,
    instances: Arc<InstanceService>,
    schema: Arc<SchemaService>,
    queries: Arc<QueryEngine>,
    client: Arc<NativeClient>,
}

impl MetamodelEngine {
    /// Connect to the platform store and serve the catalog persisted there
    pub async fn connect(config: &Config) -> Result<Self> {
        let platform = Arc::new(connect_platform(config).await?);

        if config.run_migrations {
            use crate::infra::storage::migrations::Migrator;
            use sea_orm_migration::MigratorTrait;

            Migrator::up(platform.as_ref(), None)
                .await
                .context("catalog migrations failed")?;
            tracing::info!("Metamodel catalog migrations completed");
        }

        let catalog: Arc<dyn TypeCatalog> = Arc::new(SeaOrmTypeCatalog::new(platform.clone()));
        let links: Arc<dyn LinkInstanceRepository> =
            Arc::new(SeaOrmLinkInstanceRepository::new(platform.clone()));
        Self::assemble(config, platform, catalog, links)
    }

    /// Wire the engine around an existing platform connection and externally owned catalog
    pub fn assemble(
        config: &Config,
        platform: Arc<DatabaseConnection>,
        catalog: Arc<dyn TypeCatalog>,
        links: Arc<dyn LinkInstanceRepository>,
    ) -> Result<Self> {
        let registry = Arc::new(ConnectorRegistry::with_builtin());
        let platform_connector = registry
            .get(&config.platform_dialect())
            .context("unsupported platform dialect")?;

        if config.secret_passphrase.is_empty() {
            tracing::warn!("secret_passphrase is empty; stored datasource passwords use a weak key");
        }
        let cipher = Arc::new(AesGcmSecretCipher::from_passphrase(&config.secret_passphrase));
        let connections = Arc::new(ConnectionManager::new(
            registry,
            cipher,
            config.connect_timeout,
            config.validation_timeout,
        ));

        let tables = Arc::new(DynamicTableManager::new(catalog.clone()));
        let resolver = Arc::new(StorageResolver::new(catalog.clone(), connections.clone()));
        let platform_store = PlatformStore::new(platform.clone(), platform_connector);

        let instances = Arc::new(InstanceService::new(
            catalog.clone(),
            tables.clone(),
            resolver.clone(),
            platform_store.clone(),
        ));
        let schema = Arc::new(SchemaService::new(
            catalog.clone(),
            tables,
            resolver,
            platform_store,
        ));
        let queries = Arc::new(QueryEngine::new(catalog, links));

        let client = Arc::new(NativeClient::new(
            instances.clone(),
            schema.clone(),
            queries.clone(),
            connections.clone(),
            RequestLimits {
                max_page_size: config.max_page_size,
                max_query_depth: config.max_query_depth,
            },
        ));

        tracing::info!(
            platform_dialect = %config.platform_dialect(),
            "Metamodel engine initialized"
        );
        Ok(Self {
            platform,
            connections,
            instances,
            schema,
            queries,
            client,
        })
    }

    /// In-process client implementing every engine API trait
    pub fn client(&self) -> Arc<NativeClient> {
        self.client.clone()
    }

    pub fn instances(&self) -> Arc<InstanceService> {
        self.instances.clone()
    }

    pub fn schema(&self) -> Arc<SchemaService> {
        self.schema.clone()
    }

    pub fn queries(&self) -> Arc<QueryEngine> {
        self.queries.clone()
    }

    pub fn connections(&self) -> Arc<ConnectionManager> {
        self.connections.clone()
    }

    pub fn platform(&self) -> Arc<DatabaseConnection> {
        self.platform.clone()
    }
}

async fn connect_platform(config: &Config) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.platform_database_url.clone());
    options
        .max_connections(config.platform_max_connections)
        .connect_timeout(config.connect_timeout)
        .sqlx_logging(false);
    Database::connect(options).await.with_context(|| {
        format!(
            "failed to connect to platform store {}",
            crate::infra::datasource::connector::redact_url(&config.platform_database_url)
        )
    })
}

/// Install a global fmt subscriber filtered by `RUST_LOG`, defaulting to `info`
pub fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
