//! Mensa Currency Conversion
//!
//! Converts base-currency prices into the reporting currency.
//!
//! # Architecture
//!
//! ```text
//! OrderService → CurrencyConverter (RateConverter) → RateProvider
//!                                                     ├─ CachedRates → HttpRateProvider
//!                                                     └─ StubRates (tests, development)
//! ```
//!
//! # Components
//!
//! - **Ports**: `CurrencyConverter` (amount conversion) and `RateProvider` (raw rates)
//! - **RateConverter**: applies a rate and rounds to cents
//! - **CachedRates**: TTL cache in front of any provider
//! - **HttpRateProvider**: fetches `latest` rates from an HTTP rate service
//! - **Stub**: fixed rates with failure injection
//!
//! # Example
//!
//! ```rust,ignore
//! use mensa_currency::{CurrencyConverter, RateConverter, StubRates};
//! use mensa_domain::Currency;
//!
//! let converter = RateConverter::new(StubRates::new());
//! let usd = converter.convert(Currency::EUR, Currency::USD, dec!(4.50)).await?;
//! ```

#![warn(clippy::all)]

pub mod cache;
pub mod error;
pub mod http;
pub mod ports;
pub mod stub;

// Re-exports for convenience
pub use cache::CachedRates;
pub use error::{CurrencyError, CurrencyResult};
pub use http::HttpRateProvider;
pub use ports::{CurrencyConverter, RateConverter, RateProvider};
pub use stub::StubRates;
