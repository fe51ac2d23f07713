//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together all components:
//! - Store (memory or PostgreSQL)
//! - Currency converter (stub or cached HTTP rates)
//! - Order service
//! - API Server (HTTP endpoints)
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Initialize components
//! 3. Start API server
//! 4. Wait for SIGINT or a cancelled shutdown token
//! 5. Drain in-flight requests and exit

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use mensa_currency::{CachedRates, CurrencyConverter, HttpRateProvider, RateConverter, StubRates};
use mensa_store::{MemoryStore, RetryPolicy, Store};

use crate::api::{create_router, ApiState};
use crate::config::Config;
use crate::error::{DaemonError, DaemonResult};
use crate::service::OrderService;

// =============================================================================
// Daemon
// =============================================================================

/// The main Mensa daemon.
pub struct Daemon<S: Store + 'static> {
    /// Configuration
    config: Config,
    /// Order intake pipeline
    orders: Arc<OrderService<S>>,
    /// Cancelled to stop the API server
    shutdown: CancellationToken,
}

impl Daemon<MemoryStore> {
    /// Create a daemon over the in-memory store, seeded with the demo menu.
    pub fn new_stub(config: Config) -> Self {
        let retry = RetryPolicy::new(config.persistence.persist_attempts);
        let store = MemoryStore::with_retry(retry).with_catalog(mensa_db::demo_menu());

        Self::new(config, Arc::new(store))
    }
}

#[cfg(feature = "postgres")]
impl Daemon<mensa_store::PgStore> {
    /// Connect to PostgreSQL using `DATABASE_URL` from the configuration.
    pub async fn connect(config: Config) -> DaemonResult<Self> {
        let url = config.persistence.database_url.clone().ok_or_else(|| {
            DaemonError::Config("DATABASE_URL is required for the postgres store".to_string())
        })?;

        let pool = sqlx::PgPool::connect(&url)
            .await
            .map_err(mensa_store::StoreError::from)?;
        info!("Connected to PostgreSQL");

        let retry = RetryPolicy::new(config.persistence.persist_attempts);
        let store = mensa_store::PgStore::with_retry(pool, retry);

        Ok(Self::new(config, Arc::new(store)))
    }
}

impl<S: Store + 'static> Daemon<S> {
    /// Create a new daemon over a provided store.
    pub fn new(config: Config, store: Arc<S>) -> Self {
        let converter = build_converter(&config);
        let orders = Arc::new(OrderService::new(
            store,
            converter,
            config.currency.base,
            config.currency.report,
        ));

        Self {
            config,
            orders,
            shutdown: CancellationToken::new(),
        }
    }

    /// Get the order service.
    pub fn orders(&self) -> &Arc<OrderService<S>> {
        &self.orders
    }

    /// Token that stops the daemon when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT or the token).
    pub async fn run(self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            base = %self.config.currency.base,
            report = %self.config.currency.report,
            "Starting Mensa daemon"
        );

        let (api_addr, server) = self.start_api_server().await?;
        info!(%api_addr, "API server started");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
            }
            _ = self.shutdown.cancelled() => {
                info!("Shutdown requested");
            }
        }

        self.shutdown.cancel();
        if let Err(e) = server.await {
            error!(error = %e, "API server task failed");
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Start the API server; it stops once the shutdown token is cancelled.
    async fn start_api_server(&self) -> DaemonResult<(SocketAddr, JoinHandle<()>)> {
        let state = Arc::new(ApiState {
            orders: self.orders.clone(),
        });

        let router = create_router(state);
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);

        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            DaemonError::Config(format!("Failed to bind to {}: {}", addr, e))
        })?;

        let local_addr = listener.local_addr()?;

        let shutdown = self.shutdown.clone();
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "API server error");
            }
        });

        Ok((local_addr, server))
    }
}

/// Pick the converter: cached HTTP rates when a rate service is configured,
/// fixed stub rates otherwise.
fn build_converter(config: &Config) -> Arc<dyn CurrencyConverter> {
    match &config.currency.rates_url {
        Some(url) => {
            info!(%url, ttl_secs = config.currency.rates_ttl_secs, "Using HTTP rate provider");
            let provider = CachedRates::new(
                HttpRateProvider::new(url.clone()),
                Duration::from_secs(config.currency.rates_ttl_secs),
            );
            Arc::new(RateConverter::new(provider))
        },
        None => {
            info!("No rate service configured, using stub rates");
            Arc::new(RateConverter::new(StubRates::new()))
        },
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_daemon_stub_has_demo_menu() {
        let daemon = Daemon::new_stub(Config::test());

        let found = daemon
            .orders()
            .store()
            .catalog()
            .find_active(&[1, 2, 6])
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_daemon_api_server_start() {
        let daemon = Daemon::new_stub(Config::test());

        let (addr, _server) = daemon.start_api_server().await.unwrap();

        // Server should be running on a port
        assert!(addr.port() > 0);

        // Can make a health check request
        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn test_daemon_accepts_order_over_http() {
        let daemon = Daemon::new_stub(Config::test());
        let (addr, _server) = daemon.start_api_server().await.unwrap();

        let response = reqwest::Client::new()
            .post(format!("http://{}/api/v1/orders", addr))
            .header("Idempotency-Key", "1")
            .json(&serde_json::json!({
                "address": "Some address",
                "phone": "+7955441112",
                "positions": [{ "id": 1, "count": 1 }]
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["data"]["status"], "new");
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_server() {
        let daemon = Daemon::new_stub(Config::test());
        let (_addr, server) = daemon.start_api_server().await.unwrap();

        daemon.shutdown_token().cancel();

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
    }
}
