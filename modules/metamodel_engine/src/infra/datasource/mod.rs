//! Datasource connectivity: dialect connectors, their registry, and the connection manager

pub mod connector;
pub mod dialects;
pub mod introspect;
pub mod manager;
pub mod registry;
pub mod sql;

pub use connector::{DialectConnector, QuoteStyle};
pub use manager::ConnectionManager;
pub use registry::ConnectorRegistry;
