//! TTL cache in front of a rate provider.
//!
//! Rates are cached per pair with `moka`. Failures are never cached, so a
//! rate service outage is retried on the next lookup.

use async_trait::async_trait;
use moka::future::Cache;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::debug;

use mensa_domain::Currency;

use crate::error::CurrencyResult;
use crate::ports::RateProvider;

/// Pairs are few; this only bounds a misconfigured deployment.
const MAX_CACHED_PAIRS: u64 = 1_000;

/// Rate provider wrapper that caches successful lookups for a fixed TTL.
pub struct CachedRates<P> {
    inner: P,
    cache: Cache<(Currency, Currency), Decimal>,
}

impl<P: RateProvider> CachedRates<P> {
    /// Wrap `inner`, keeping each rate for `ttl`.
    pub fn new(inner: P, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CACHED_PAIRS)
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }

    /// Get a reference to the wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Drop every cached rate.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl<P: RateProvider> RateProvider for CachedRates<P> {
    async fn rate(&self, from: Currency, to: Currency) -> CurrencyResult<Decimal> {
        let key = (from, to);

        if let Some(rate) = self.cache.get(&key).await {
            debug!(%from, %to, "Cache hit for rate");
            return Ok(rate);
        }

        let rate = self.inner.rate(from, to).await?;
        self.cache.insert(key, rate).await;
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubRates;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let cached = CachedRates::new(StubRates::new(), Duration::from_secs(60));

        let a = cached.rate(Currency::EUR, Currency::USD).await.unwrap();
        let b = cached.rate(Currency::EUR, Currency::USD).await.unwrap();

        assert_eq!(a, dec!(1.08));
        assert_eq!(a, b);
        assert_eq!(cached.inner().lookups(), 1);
    }

    #[tokio::test]
    async fn test_cached_rate_survives_outage() {
        let cached = CachedRates::new(StubRates::new(), Duration::from_secs(60));
        cached.rate(Currency::EUR, Currency::USD).await.unwrap();

        cached.inner().set_unavailable(true);

        assert_eq!(cached.rate(Currency::EUR, Currency::USD).await.unwrap(), dec!(1.08));
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cached = CachedRates::new(StubRates::new(), Duration::from_secs(60));
        cached.inner().set_fail_next(true);

        assert!(cached.rate(Currency::EUR, Currency::USD).await.is_err());
        assert!(cached.rate(Currency::EUR, Currency::USD).await.is_ok());
        assert_eq!(cached.inner().lookups(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_refetches() {
        let cached = CachedRates::new(StubRates::new(), Duration::from_secs(60));
        cached.rate(Currency::EUR, Currency::USD).await.unwrap();

        cached.inner().set_rate(Currency::EUR, Currency::USD, dec!(1.10));
        cached.invalidate_all();

        assert_eq!(cached.rate(Currency::EUR, Currency::USD).await.unwrap(), dec!(1.10));
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cached = CachedRates::new(StubRates::new(), Duration::from_millis(50));
        cached.rate(Currency::EUR, Currency::USD).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        cached.rate(Currency::EUR, Currency::USD).await.unwrap();

        assert_eq!(cached.inner().lookups(), 2);
    }
}
