//! Configuration for the metamodel engine

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix, e.g. `METAMODEL_MAX_PAGE_SIZE=200`
pub const ENV_PREFIX: &str = "METAMODEL_";

/// Keys read from the environment; other `METAMODEL_*` variables are ignored
const ENV_KEYS: &[&str] = &[
    "platform_database_url",
    "platform_dialect",
    "platform_max_connections",
    "secret_passphrase",
    "connect_timeout",
    "validation_timeout",
    "max_page_size",
    "max_query_depth",
    "run_migrations",
];

/// Metamodel engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Connection URL of the platform store
    #[serde(default = "default_platform_database_url")]
    pub platform_database_url: String,

    /// Dialect code of the platform store; derived from the URL scheme when unset
    #[serde(default)]
    pub platform_dialect: Option<String>,

    #[serde(default = "default_platform_max_connections")]
    pub platform_max_connections: u32,

    /// Passphrase the datasource password key is derived from
    #[serde(default)]
    pub secret_passphrase: String,

    /// Timeout for opening a datasource connection
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Timeout for the liveness check of `test_connection`
    #[serde(default = "default_validation_timeout", with = "humantime_serde")]
    pub validation_timeout: Duration,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,

    /// Upper bound for graph search depth accepted from callers
    #[serde(default = "default_max_query_depth")]
    pub max_query_depth: usize,

    /// Run catalog migrations on startup
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform_database_url: default_platform_database_url(),
            platform_dialect: None,
            platform_max_connections: default_platform_max_connections(),
            secret_passphrase: String::new(),
            connect_timeout: default_connect_timeout(),
            validation_timeout: default_validation_timeout(),
            max_page_size: default_max_page_size(),
            max_query_depth: default_max_query_depth(),
            run_migrations: true,
        }
    }
}

impl Config {
    /// Load from an optional YAML file, then `METAMODEL_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).only(ENV_KEYS))
            .extract()
            .context("invalid metamodel engine configuration")
    }

    /// Platform dialect code, explicit or derived from the URL scheme
    pub fn platform_dialect(&self) -> String {
        if let Some(dialect) = self.platform_dialect.as_deref().filter(|d| !d.is_empty()) {
            return dialect.to_ascii_uppercase();
        }
        let scheme = self
            .platform_database_url
            .split(':')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => "POSTGRESQL",
            "mysql" => "MYSQL",
            "mariadb" => "MARIADB",
            "sqlite" => "SQLITE",
            _ => "GENERIC",
        }
        .to_string()
    }
}

fn default_platform_database_url() -> String {
    "postgres://localhost:5432/metamodel".to_string()
}

fn default_platform_max_connections() -> u32 {
    10
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_validation_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_max_page_size() -> u64 {
    1000
}

fn default_max_query_depth() -> usize {
    8
}

fn default_true() -> bool {
    true
}
