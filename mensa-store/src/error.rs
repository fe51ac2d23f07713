//! Storage layer errors

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        /// Type of entity (order, menu item, idempotency key)
        entity_type: String,
        /// Entity ID
        id: String,
    },

    /// Duplicate entity (unique key already taken)
    #[error("Duplicate entity: {entity_type} with id {id}")]
    Duplicate {
        /// Type of entity
        entity_type: String,
        /// Entity ID
        id: String,
    },

    /// Transient write conflict (serialization failure, deadlock).
    /// The whole transaction may be retried.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Stored row could not be turned back into a domain value
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Domain error passthrough
    #[error("Domain error: {0}")]
    Domain(#[from] mensa_domain::DomainError),
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Create a duplicate error
    pub fn duplicate(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Whether re-running the same transaction may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    /// Whether this is a unique-key collision.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

/// SQLSTATE for `unique_violation`.
#[cfg(feature = "postgres")]
pub(crate) const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATEs for `serialization_failure` and `deadlock_detected`.
#[cfg(feature = "postgres")]
const TRANSIENT_CODES: [&str; 2] = ["40001", "40P01"];

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound {
                entity_type: "unknown".to_string(),
                id: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => StoreError::Duplicate {
                    entity_type: db_err.table().unwrap_or("unknown").to_string(),
                    id: db_err.constraint().unwrap_or("unknown").to_string(),
                },
                Some(code) if TRANSIENT_CODES.contains(&code) => {
                    StoreError::Conflict(db_err.to_string())
                },
                _ => StoreError::Database(db_err.to_string()),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Connection(err.to_string())
            },
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Deserialization(err.to_string())
            },
            _ => StoreError::Database(err.to_string()),
        }
    }
}
