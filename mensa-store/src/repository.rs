//! Repository trait definitions (Ports)
//!
//! These traits define the storage interface for order intake.
//! Implementations can be PostgreSQL, in-memory, or mock for testing.

use crate::error::StoreError;
use async_trait::async_trait;
use mensa_domain::{
    CatalogItem, IdempotencyKey, IdempotencyRecord, IdempotencyScope, MenuItemId, NewOrder,
    Order, OrderId, OrderToken,
};
use std::collections::HashMap;

/// Read-only view of the menu catalog
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Resolve requested ids to active items.
    ///
    /// Unknown and inactive ids are absent from the result.
    async fn find_active(
        &self,
        ids: &[MenuItemId],
    ) -> Result<HashMap<MenuItemId, CatalogItem>, StoreError>;
}

/// An idempotency key to register together with a new order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyClaim {
    /// Caller namespace
    pub scope: IdempotencyScope,
    /// Client-supplied key
    pub key: IdempotencyKey,
}

impl IdempotencyClaim {
    /// Create a claim
    pub fn new(scope: IdempotencyScope, key: IdempotencyKey) -> Self {
        Self { scope, key }
    }
}

/// Repository for Order aggregates
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist the order header, all positions, and the optional
    /// idempotency claim as one transaction.
    ///
    /// Either every row becomes visible or none does. Transient conflicts
    /// re-run the whole transaction under the store's `RetryPolicy`.
    ///
    /// # Errors
    /// - `StoreError::Duplicate` if the claim's key is already registered;
    ///   nothing from this call is persisted
    /// - `StoreError::Conflict` once retries are exhausted
    async fn save(
        &self,
        order: &NewOrder,
        claim: Option<&IdempotencyClaim>,
    ) -> Result<Order, StoreError>;

    /// Find an order by ID
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Find an order by its public token
    async fn find_by_token(&self, token: &OrderToken) -> Result<Option<Order>, StoreError>;
}

/// Repository for idempotency keys
#[async_trait]
pub trait IdempotencyRepository: Send + Sync {
    /// Look up the order a key was registered for
    async fn find(
        &self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, StoreError>;
}

/// Combined store interface
pub trait Store: Send + Sync {
    /// Get catalog lookup
    fn catalog(&self) -> &dyn CatalogLookup;

    /// Get order repository
    fn orders(&self) -> &dyn OrderRepository;

    /// Get idempotency repository
    fn idempotency(&self) -> &dyn IdempotencyRepository;
}
