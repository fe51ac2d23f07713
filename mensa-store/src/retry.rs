//! Bounded retry for transactional writes.

use std::future::Future;
use tracing::warn;

use crate::error::StoreError;

/// Attempts made for one save unless configured otherwise.
pub const DEFAULT_PERSIST_ATTEMPTS: u32 = 2;

/// How many times a transaction is run before a transient conflict is
/// surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
}

impl RetryPolicy {
    /// Policy with `attempts` total runs (clamped to at least 1).
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }

    /// Total runs allowed.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Only `StoreError::is_transient` errors are retried. Each run must be a
    /// complete transaction so that a failed attempt leaves nothing behind.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.attempts,
                        error = %e,
                        "Transient write conflict, retrying"
                    );
                    attempt += 1;
                },
                result => return result,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PERSIST_ATTEMPTS)
    }
}
