//! Domain-level error taxonomy for the remedy core.

use remedy_state::{InvalidId, StorageError};
use serde::{Deserialize, Serialize};

/// Remedy core domain errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemedyError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for remedy core operations.
pub type Result<T> = std::result::Result<T, RemedyError>;

impl RemedyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        RemedyError::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        RemedyError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        RemedyError::Authorization(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RemedyError::Validation(_) => ErrorKind::Validation,
            RemedyError::NotFound { .. } => ErrorKind::NotFound,
            RemedyError::Authorization(_) => ErrorKind::Authorization,
            RemedyError::Conflict(_) => ErrorKind::Conflict,
            RemedyError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Convert into the serializable shape handed to outer layers.
    pub fn to_failure(&self) -> Failure {
        Failure {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<StorageError> for RemedyError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => RemedyError::NotFound { entity, id },
            StorageError::Duplicate { entity, key } => {
                RemedyError::Conflict(format!("{entity} already exists: {key}"))
            }
            StorageError::Backend(msg) => RemedyError::Internal(msg),
        }
    }
}

impl From<InvalidId> for RemedyError {
    fn from(err: InvalidId) -> Self {
        RemedyError::Validation(err.to_string())
    }
}

/// Error category, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authorization,
    Conflict,
    Internal,
}

/// Serializable failure result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remedy_error_display() {
        let err = RemedyError::validation("keywords must not be empty");
        assert!(err.to_string().contains("validation error"));

        let err = RemedyError::not_found("review", "abc");
        assert_eq!(err.to_string(), "review not found: abc");

        let err = RemedyError::unauthorized("only the author may edit");
        assert!(err.to_string().contains("not authorized"));
    }

    #[test]
    fn test_storage_error_mapping() {
        let err: RemedyError = StorageError::duplicate("remedy", "Ginger").into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("Ginger"));

        let err: RemedyError = StorageError::not_found("source", "s-1").into();
        assert_eq!(err, RemedyError::not_found("source", "s-1"));

        let err: RemedyError = StorageError::Backend("socket closed".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_malformed_id_is_validation() {
        let bad = "nope".parse::<remedy_state::ReviewId>().unwrap_err();
        let err = RemedyError::from(bad);
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_failure_serializes_kind_in_snake_case() {
        let failure = RemedyError::not_found("remedy", "r-9").to_failure();
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "not_found");
        assert_eq!(json["message"], "remedy not found: r-9");
    }
}
