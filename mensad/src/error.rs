//! Daemon error types.

use mensa_currency::CurrencyError;
use mensa_domain::{DomainError, ValidationError};
use mensa_store::StoreError;
use thiserror::Error;

/// Why an order submission or lookup did not succeed.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Submission broke one or more business rules; nothing was written
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Exchange rate could not be obtained; nothing was written
    #[error("Currency conversion unavailable: {0}")]
    ConversionUnavailable(#[source] CurrencyError),

    /// Menu catalog could not be read; nothing was written
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(#[source] StoreError),

    /// Order could not be stored (after retries) or read back
    #[error("Persistence failed: {0}")]
    PersistenceFailed(#[source] StoreError),

    /// No order with this token
    #[error("Order not found: {0}")]
    NotFound(String),

    /// Malformed request metadata (headers)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Domain invariant violated while building the order
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Currency error
    #[error("Currency error: {0}")]
    Currency(#[from] CurrencyError),

    /// Order pipeline error
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Socket or server I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
