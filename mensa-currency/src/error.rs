//! Currency conversion error types.

use mensa_domain::Currency;
use thiserror::Error;

/// Errors that can occur while resolving exchange rates.
#[derive(Debug, Clone, Error)]
pub enum CurrencyError {
    /// Rate source has no rate for the pair
    #[error("No rate available for {from}->{to}")]
    RateUnavailable {
        /// Source currency
        from: Currency,
        /// Target currency
        to: Currency,
    },

    /// HTTP request failed
    #[error("Rate request failed: {0}")]
    RequestFailed(String),

    /// Rate service answered with something unparseable
    #[error("Failed to parse rate response: {0}")]
    ParseError(String),

    /// Request timed out
    #[error("Rate request timed out")]
    Timeout,

    /// Rate is non-positive or too large to apply
    #[error("Invalid rate {rate} for {from}->{to}")]
    InvalidRate {
        /// Source currency
        from: Currency,
        /// Target currency
        to: Currency,
        /// Offending rate as received
        rate: String,
    },
}

/// Result type for currency operations.
pub type CurrencyResult<T> = Result<T, CurrencyError>;
