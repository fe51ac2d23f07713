//! Currency port definitions.
//!
//! `CurrencyConverter` is what order intake consumes. `RateProvider` is the
//! narrower seam adapters implement (HTTP service, stub, cache).

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use mensa_domain::{round_money, Currency};

use crate::error::{CurrencyError, CurrencyResult};

// =============================================================================
// Converter Port
// =============================================================================

/// Port for converting an amount between two currencies.
///
/// Implementations must be deterministic for a given rate snapshot.
#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    /// Convert `amount` from `from` into `to`.
    ///
    /// # Errors
    ///
    /// Any `CurrencyError` means the rate could not be obtained; callers
    /// must not fall back to a guessed amount.
    async fn convert(&self, from: Currency, to: Currency, amount: Decimal)
        -> CurrencyResult<Decimal>;
}

// =============================================================================
// Rate Provider Port
// =============================================================================

/// Port for obtaining a raw exchange rate (1 `from` = rate × `to`).
///
/// Implementations:
/// - `HttpRateProvider` - remote rate service
/// - `CachedRates` - TTL cache around another provider
/// - `StubRates` - fixed rates for tests and development
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the current rate for a pair.
    async fn rate(&self, from: Currency, to: Currency) -> CurrencyResult<Decimal>;
}

#[async_trait]
impl<P: RateProvider + ?Sized> RateProvider for Arc<P> {
    async fn rate(&self, from: Currency, to: Currency) -> CurrencyResult<Decimal> {
        (**self).rate(from, to).await
    }
}

// =============================================================================
// Rate Converter
// =============================================================================

/// Converter that multiplies by a provider's rate and rounds to cents.
pub struct RateConverter<P> {
    provider: P,
}

impl<P: RateProvider> RateConverter<P> {
    /// Create a converter over a rate provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P: RateProvider> CurrencyConverter for RateConverter<P> {
    async fn convert(
        &self,
        from: Currency,
        to: Currency,
        amount: Decimal,
    ) -> CurrencyResult<Decimal> {
        if from == to {
            return Ok(amount);
        }

        let rate = self.provider.rate(from, to).await?;
        let converted = amount.checked_mul(rate).ok_or_else(|| CurrencyError::InvalidRate {
            from,
            to,
            rate: rate.to_string(),
        })?;

        Ok(round_money(converted))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CurrencyError;
    use crate::stub::StubRates;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_convert_applies_rate_and_rounds() {
        let rates = StubRates::new().with_rate(Currency::EUR, Currency::USD, dec!(1.0812));
        let converter = RateConverter::new(rates);

        let usd = converter.convert(Currency::EUR, Currency::USD, dec!(4.50)).await.unwrap();

        // 4.50 * 1.0812 = 4.8654
        assert_eq!(usd, dec!(4.87));
    }

    #[tokio::test]
    async fn test_convert_same_currency_is_identity() {
        let rates = StubRates::new();
        rates.set_unavailable(true);
        let converter = RateConverter::new(rates);

        let eur = converter.convert(Currency::EUR, Currency::EUR, dec!(4.555)).await.unwrap();

        assert_eq!(eur, dec!(4.555));
        assert_eq!(converter.provider().lookups(), 0);
    }

    #[tokio::test]
    async fn test_convert_is_deterministic() {
        let converter = RateConverter::new(StubRates::new());

        let a = converter.convert(Currency::EUR, Currency::USD, dec!(6.20)).await.unwrap();
        let b = converter.convert(Currency::EUR, Currency::USD, dec!(6.20)).await.unwrap();

        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_convert_propagates_unavailable() {
        let rates = StubRates::new();
        rates.set_fail_next(true);
        let converter = RateConverter::new(rates);

        let result = converter.convert(Currency::EUR, Currency::USD, dec!(1)).await;

        assert!(matches!(result, Err(CurrencyError::RateUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_convert_overflowing_rate_is_an_error() {
        let rates = StubRates::new().with_rate(Currency::EUR, Currency::USD, Decimal::MAX);
        let converter = RateConverter::new(rates);

        let result = converter.convert(Currency::EUR, Currency::USD, dec!(8.50)).await;

        assert!(matches!(result, Err(CurrencyError::InvalidRate { .. })));
    }
}
