//! Contract error types for the metamodel engine
//!
//! These errors are transport-agnostic and used for inter-module communication.
//! Every variant belongs to exactly one [`ErrorKind`]; callers branch on the kind.

use super::model::DataType;

/// Error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    UnsupportedOperation,
    Connection,
    StorageInconsistency,
    Internal,
}

/// Metamodel engine domain errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Object type, property, link type, instance or datasource not found
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Resource type (object_type, instance, link_type, ...)
        resource: String,
        /// Resource identifier
        id: String,
    },

    /// No connector registered for a dialect code
    #[error("unsupported datasource dialect '{code}' (supported: {})", supported.join(", "))]
    UnsupportedDialect { code: String, supported: Vec<String> },

    /// Duplicate name, code or storage binding
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    #[error("property '{property}' is required")]
    MissingRequiredField { property: String },

    #[error("property '{property}' must be of type {expected}")]
    InvalidPropertyType { property: String, expected: DataType },

    #[error("invalid identifier: {reason}")]
    InvalidIdentifier { reason: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    /// The dialect or store cannot perform the operation
    #[error("operation '{operation}' is not supported by {dialect}")]
    UnsupportedOperation { operation: String, dialect: String },

    /// Driver missing, authentication or network failure
    #[error("datasource '{datasource}' connection failed: {message}")]
    Connection { datasource: String, message: String },

    /// A statement failed against a reachable store
    #[error("datasource '{store}' statement failed: {message}")]
    Database { store: String, message: String },

    /// Instance row references a storage binding that no longer exists
    #[error("instance of '{object_type}' references missing storage datasource {datasource_id}")]
    StorageInconsistency {
        object_type: String,
        datasource_id: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::UnsupportedDialect { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::MissingRequiredField { .. }
            | Self::InvalidPropertyType { .. }
            | Self::InvalidIdentifier { .. }
            | Self::Validation { .. } => ErrorKind::Validation,
            Self::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            Self::Connection { .. } | Self::Database { .. } => ErrorKind::Connection,
            Self::StorageInconsistency { .. } => ErrorKind::StorageInconsistency,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn database(store: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Database {
            store: store.into(),
            message: err.to_string(),
        }
    }

    pub fn connection(datasource: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Connection {
            datasource: datasource.into(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<EngineError>() {
            Ok(engine) => engine,
            Err(other) => Self::Internal(format!("{other:#}")),
        }
    }
}
