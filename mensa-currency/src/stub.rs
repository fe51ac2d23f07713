//! Stub rate provider for testing and local development.
//!
//! Serves fixed rates from memory without making real API calls.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use mensa_domain::Currency;

use crate::error::{CurrencyError, CurrencyResult};
use crate::ports::RateProvider;

/// Stub rate provider.
///
/// Knows EUR→USD out of the box. Failures can be injected once
/// (`set_fail_next`) or permanently (`set_unavailable`).
pub struct StubRates {
    /// Rates by (from, to)
    rates: RwLock<HashMap<(Currency, Currency), Decimal>>,
    /// Fail the next lookup only
    fail_next: AtomicBool,
    /// Fail every lookup until cleared
    unavailable: AtomicBool,
    /// Number of lookups served or failed
    lookups: AtomicU64,
}

impl StubRates {
    /// Create a stub with the default EUR→USD rate of 1.08.
    pub fn new() -> Self {
        let mut rates = HashMap::new();
        rates.insert((Currency::EUR, Currency::USD), Decimal::new(108, 2));
        Self {
            rates: RwLock::new(rates),
            fail_next: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
            lookups: AtomicU64::new(0),
        }
    }

    /// Builder-style variant of `set_rate`.
    pub fn with_rate(self, from: Currency, to: Currency, rate: Decimal) -> Self {
        self.set_rate(from, to, rate);
        self
    }

    /// Set the rate for a pair.
    pub fn set_rate(&self, from: Currency, to: Currency, rate: Decimal) {
        let mut rates = self.rates.write().unwrap_or_else(|e| e.into_inner());
        rates.insert((from, to), rate);
    }

    /// Configure the next lookup to fail.
    pub fn set_fail_next(&self, fail: bool) {
        self.fail_next.store(fail, Ordering::SeqCst);
    }

    /// Make every lookup fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of rate lookups made against this stub.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }

    fn should_fail(&self) -> bool {
        self.fail_next.swap(false, Ordering::SeqCst) || self.unavailable.load(Ordering::SeqCst)
    }
}

impl Default for StubRates {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateProvider for StubRates {
    async fn rate(&self, from: Currency, to: Currency) -> CurrencyResult<Decimal> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if self.should_fail() {
            tracing::debug!(%from, %to, "Stub: simulated rate failure");
            return Err(CurrencyError::RateUnavailable { from, to });
        }

        let rates = self.rates.read().unwrap_or_else(|e| e.into_inner());
        rates
            .get(&(from, to))
            .copied()
            .ok_or(CurrencyError::RateUnavailable { from, to })
    }
}
