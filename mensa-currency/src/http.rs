//! HTTP rate provider.
//!
//! Talks to a Frankfurter-style rate service:
//!
//! ```text
//! GET {base_url}/latest?base=EUR&symbols=USD
//! {"amount":1.0,"base":"EUR","date":"2026-10-16","rates":{"USD":1.0812}}
//! ```

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use mensa_domain::Currency;

use crate::error::{CurrencyError, CurrencyResult};
use crate::ports::RateProvider;

/// Default rate service.
pub const DEFAULT_RATES_URL: &str = "https://api.frankfurter.app";

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Body of a `latest` response. Rates stay as raw JSON numbers so they can
/// be read into `Decimal` without a float round-trip.
#[derive(Debug, Deserialize)]
struct LatestRates {
    base: String,
    rates: HashMap<String, serde_json::Value>,
}

/// Rate provider backed by an HTTP rate service.
pub struct HttpRateProvider {
    client: Client,
    base_url: String,
}

impl HttpRateProvider {
    /// Create a provider for the given service URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Service URL this provider queries.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_latest(&self, from: Currency, to: Currency) -> CurrencyResult<String> {
        let url = format!("{}/latest?base={}&symbols={}", self.base_url, from, to);
        debug!(%url, "Fetching exchange rate");

        let response = timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.client.get(&url).send(),
        )
        .await
        .map_err(|_| CurrencyError::Timeout)?
        .map_err(|e| CurrencyError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CurrencyError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            warn!(%status, %from, %to, "Rate service returned an error");
            return Err(CurrencyError::RequestFailed(format!("HTTP {}: {}", status, body)));
        }

        Ok(body)
    }
}

impl Default for HttpRateProvider {
    fn default() -> Self {
        Self::new(DEFAULT_RATES_URL)
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn rate(&self, from: Currency, to: Currency) -> CurrencyResult<Decimal> {
        let body = self.get_latest(from, to).await?;
        parse_latest(&body, from, to)
    }
}

/// Extract the `to` rate from a `latest` response body.
fn parse_latest(body: &str, from: Currency, to: Currency) -> CurrencyResult<Decimal> {
    let latest: LatestRates =
        serde_json::from_str(body).map_err(|e| CurrencyError::ParseError(e.to_string()))?;

    if !latest.base.eq_ignore_ascii_case(from.code()) {
        return Err(CurrencyError::ParseError(format!(
            "expected base {}, got {}",
            from, latest.base
        )));
    }

    let raw = latest
        .rates
        .get(to.code())
        .ok_or(CurrencyError::RateUnavailable { from, to })?;

    let text = match raw {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => return Err(CurrencyError::ParseError(format!("rate is not a number: {}", other))),
    };

    let rate = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| CurrencyError::ParseError(format!("{}: {}", text, e)))?;

    if rate <= Decimal::ZERO {
        return Err(CurrencyError::InvalidRate { from, to, rate: text });
    }

    Ok(rate)
}
