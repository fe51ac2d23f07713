//! Mensa Daemon Library
//!
//! Runtime for the order intake service.
//!
//! # Architecture
//!
//! ```text
//! HTTP → API → OrderService ─┬─► CatalogLookup
//!                            ├─► CurrencyConverter
//!                            └─► OrderRepository (one transaction)
//! ```
//!
//! # Components
//!
//! - **Daemon**: Wires store, converter and API server
//! - **OrderService**: Validate, price, persist; idempotent replay
//! - **API**: HTTP endpoints
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use mensad::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let daemon = Daemon::new_stub(config);
//!     daemon.run().await.expect("Daemon error");
//! }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod daemon;
pub mod db;
pub mod error;
pub mod service;

// Re-exports for convenience
pub use api::{create_router, ApiState};
pub use config::{ApiConfig, Config, CurrencyConfig, Environment, PersistenceConfig};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult, OrderError};
pub use service::{OrderService, SubmitOrder, SubmitOutcome};
