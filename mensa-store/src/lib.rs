//! Mensa Storage Layer
//!
//! Provides persistence for the menu catalog, orders, and idempotency keys.
//!
//! # Architecture
//!
//! - **Repository traits**: Define the storage interface (ports)
//! - **Retry policy**: Bounded re-run of a transaction on transient conflicts
//! - **In-memory store**: Fast implementation for testing and development
//! - **PostgreSQL store**: Production implementation (feature `postgres`)
//!
//! # Usage
//!
//! ```rust,ignore
//! use mensa_store::{MemoryStore, Store};
//! use mensa_domain::CatalogItem;
//!
//! let store = MemoryStore::new();
//! store.upsert_item(CatalogItem::active(1, "Espresso", dec!(2.50)));
//!
//! let items = store.catalog().find_active(&[1]).await?;
//! let order = store.orders().save(&new_order, None).await?;
//! ```

#![warn(clippy::all)]

// Modules
mod error;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod repository;
mod retry;

// Re-exports
pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;
pub use repository::{
    CatalogLookup, IdempotencyClaim, IdempotencyRepository, OrderRepository, Store,
};
pub use retry::{RetryPolicy, DEFAULT_PERSIST_ATTEMPTS};
