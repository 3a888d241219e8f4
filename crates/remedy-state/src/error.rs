//! Error types for remedy-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the backing database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

/// Errors returned by the entity store traits
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The addressed record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness constraint rejected the write
    #[error("duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    /// The backend failed unexpectedly
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StorageError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn duplicate(entity: &'static str, key: impl Into<String>) -> Self {
        StorageError::Duplicate {
            entity,
            key: key.into(),
        }
    }
}

/// A string that is not a well-formed entity identifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed {entity} id: {value:?}")]
pub struct InvalidId {
    pub entity: &'static str,
    pub value: String,
}

/// A string that names no variant of a closed enumeration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
