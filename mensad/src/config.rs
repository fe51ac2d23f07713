//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{DaemonError, DaemonResult};
use mensa_domain::Currency;
use mensa_store::DEFAULT_PERSIST_ATTEMPTS;
use std::env;
use std::str::FromStr;

/// Seconds a fetched exchange rate stays valid unless configured otherwise.
pub const DEFAULT_RATES_TTL_SECS: u64 = 300;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Currency conversion configuration
    pub currency: CurrencyConfig,

    /// Persistence configuration
    pub persistence: PersistenceConfig,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// Currency conversion configuration.
#[derive(Debug, Clone)]
pub struct CurrencyConfig {
    /// Currency menu prices are stored in
    pub base: Currency,
    /// Secondary reporting currency (`priceUSD`)
    pub report: Currency,
    /// Rate service URL; stub rates are used when absent
    pub rates_url: Option<String>,
    /// How long a fetched rate is reused
    pub rates_ttl_secs: u64,
}

/// Persistence configuration.
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// PostgreSQL URL; the in-memory store is used when absent
    pub database_url: Option<String>,
    /// Total runs of the order transaction on transient conflicts
    pub persist_attempts: u32,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let api = Self::load_api_config()?;
        let currency = Self::load_currency_config()?;
        let persistence = Self::load_persistence_config()?;

        Ok(Self {
            api,
            currency,
            persistence,
            environment,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            currency: CurrencyConfig::default(),
            persistence: PersistenceConfig::default(),
            environment: Environment::Test,
        }
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("MENSA_ENV").unwrap_or_else(|_| "development".to_string());
        env_str.parse()
    }

    fn load_api_config() -> DaemonResult<ApiConfig> {
        let host = env::var("MENSA_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = Self::load_parsed_env("MENSA_API_PORT", 8080u16)?;

        Ok(ApiConfig { host, port })
    }

    fn load_currency_config() -> DaemonResult<CurrencyConfig> {
        let base = Self::load_parsed_env("MENSA_BASE_CURRENCY", Currency::EUR)?;
        let report = Self::load_parsed_env("MENSA_REPORT_CURRENCY", Currency::USD)?;
        let rates_url = env::var("MENSA_RATES_URL").ok().filter(|url| !url.trim().is_empty());
        let rates_ttl_secs = Self::load_parsed_env("MENSA_RATES_TTL_SECS", DEFAULT_RATES_TTL_SECS)?;

        Ok(CurrencyConfig {
            base,
            report,
            rates_url,
            rates_ttl_secs,
        })
    }

    fn load_persistence_config() -> DaemonResult<PersistenceConfig> {
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        let persist_attempts =
            Self::load_parsed_env("MENSA_PERSIST_ATTEMPTS", DEFAULT_PERSIST_ATTEMPTS)?;

        if persist_attempts == 0 {
            return Err(DaemonError::Config(
                "Invalid MENSA_PERSIST_ATTEMPTS: must be at least 1".to_string(),
            ));
        }

        Ok(PersistenceConfig {
            database_url,
            persist_attempts,
        })
    }

    fn load_parsed_env<T: FromStr>(key: &str, default: T) -> DaemonResult<T> {
        match env::var(key) {
            Ok(val) => val
                .trim()
                .parse::<T>()
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            currency: CurrencyConfig::default(),
            persistence: PersistenceConfig::default(),
            environment: Environment::Development,
        }
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            base: Currency::EUR,
            report: Currency::USD,
            rates_url: None,
            rates_ttl_secs: DEFAULT_RATES_TTL_SECS,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            persist_attempts: DEFAULT_PERSIST_ATTEMPTS,
        }
    }
}

impl FromStr for Environment {
    type Err = DaemonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid MENSA_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.environment, Environment::Development);
        assert!(config.persistence.database_url.is_none());
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.api.port, 0);
        assert_eq!(config.environment, Environment::Test);
    }

    #[test]
    fn test_currency_defaults() {
        let config = Config::default();

        assert_eq!(config.currency.base, Currency::EUR);
        assert_eq!(config.currency.report, Currency::USD);
        assert_eq!(config.currency.rates_ttl_secs, 300);
        assert!(config.currency.rates_url.is_none());
    }

    #[test]
    fn test_persist_attempts_default() {
        assert_eq!(Config::default().persistence.persist_attempts, 2);
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("TEST".parse::<Environment>().unwrap(), Environment::Test);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
