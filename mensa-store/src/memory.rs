//! In-memory store implementation
//!
//! Used for testing and development without a database.
//! Every save runs under one mutex, which plays the part of a transaction:
//! the idempotency check, id assignment, and all row writes happen together
//! or not at all.

use crate::error::StoreError;
use crate::repository::{
    CatalogLookup, IdempotencyClaim, IdempotencyRepository, OrderRepository, Store,
};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use chrono::Utc;
use mensa_domain::{
    CatalogItem, IdempotencyKey, IdempotencyRecord, IdempotencyScope, MenuItemId, NewOrder,
    Order, OrderId, OrderToken, PositionRowId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};
use tracing::debug;

/// Rows written by saves
#[derive(Default)]
struct Tables {
    orders: BTreeMap<OrderId, Order>,
    tokens: HashMap<String, OrderId>,
    idempotency: HashMap<(IdempotencyScope, IdempotencyKey), IdempotencyRecord>,
    next_order_id: OrderId,
    next_position_id: PositionRowId,
}

/// In-memory store for testing
pub struct MemoryStore {
    catalog: RwLock<HashMap<MenuItemId, CatalogItem>>,
    tables: Mutex<Tables>,
    retry: RetryPolicy,
    /// Save attempts that will fail with a transient conflict
    conflicts_remaining: AtomicU32,
    /// Fail every save with a permanent database error
    fail_saves: AtomicBool,
    /// Fail every catalog lookup with a connection error
    fail_catalog: AtomicBool,
    /// Save attempts made, including failed ones
    save_attempts: AtomicU32,
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::with_retry(RetryPolicy::default())
    }

    /// Create an empty store with a custom retry policy
    pub fn with_retry(retry: RetryPolicy) -> Self {
        Self {
            catalog: RwLock::new(HashMap::new()),
            tables: Mutex::new(Tables::default()),
            retry,
            conflicts_remaining: AtomicU32::new(0),
            fail_saves: AtomicBool::new(false),
            fail_catalog: AtomicBool::new(false),
            save_attempts: AtomicU32::new(0),
        }
    }

    /// Builder-style catalog seeding
    pub fn with_catalog(self, items: impl IntoIterator<Item = CatalogItem>) -> Self {
        for item in items {
            self.upsert_item(item);
        }
        self
    }

    /// Insert or replace a catalog item
    pub fn upsert_item(&self, item: CatalogItem) {
        let mut catalog = self.catalog.write().unwrap_or_else(|e| e.into_inner());
        catalog.insert(item.id, item);
    }

    /// Make the next `n` save attempts fail with a transient conflict
    pub fn inject_conflicts(&self, n: u32) {
        self.conflicts_remaining.store(n, Ordering::SeqCst);
    }

    /// Make every save fail with a non-retryable error
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Make every catalog lookup fail
    pub fn set_fail_catalog(&self, fail: bool) {
        self.fail_catalog.store(fail, Ordering::SeqCst);
    }

    /// Number of save attempts, including retried and failed ones
    pub fn save_attempts(&self) -> u32 {
        self.save_attempts.load(Ordering::SeqCst)
    }

    /// Get the number of orders
    pub fn order_count(&self) -> usize {
        self.lock_tables().orders.len()
    }

    /// Get the number of positions across all orders
    pub fn position_count(&self) -> usize {
        self.lock_tables().orders.values().map(|o| o.positions.len()).sum()
    }

    /// Get the number of registered idempotency keys
    pub fn idempotency_count(&self) -> usize {
        self.lock_tables().idempotency.len()
    }

    /// Clear all orders and keys (useful for test setup). The catalog is kept.
    pub fn clear(&self) {
        *self.lock_tables() = Tables::default();
        self.save_attempts.store(0, Ordering::SeqCst);
    }

    fn lock_tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn take_injected_failure(&self) -> Option<StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Some(StoreError::Database("simulated write failure".to_string()));
        }
        let took_conflict = self
            .conflicts_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        took_conflict.then(|| StoreError::Conflict("simulated serialization failure".to_string()))
    }

    /// One transaction attempt.
    fn save_once(
        &self,
        order: &NewOrder,
        claim: Option<&IdempotencyClaim>,
    ) -> Result<Order, StoreError> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        order.check_positions()?;

        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }

        let mut tables = self.lock_tables();

        if let Some(claim) = claim {
            if tables.idempotency.contains_key(&(claim.scope, claim.key.clone())) {
                return Err(StoreError::duplicate("idempotency_key", claim.key.as_str()));
            }
        }
        if tables.tokens.contains_key(order.token.as_str()) {
            return Err(StoreError::duplicate("order", order.token.as_str()));
        }

        tables.next_order_id += 1;
        let order_id = tables.next_order_id;

        let first_position = tables.next_position_id + 1;
        let position_ids: Vec<PositionRowId> =
            (first_position..first_position + order.positions.len() as PositionRowId).collect();
        tables.next_position_id += order.positions.len() as PositionRowId;

        let persisted = order.clone().into_persisted(order_id, &position_ids);

        tables.tokens.insert(persisted.token.as_str().to_string(), order_id);
        tables.orders.insert(order_id, persisted.clone());
        if let Some(claim) = claim {
            tables.idempotency.insert(
                (claim.scope, claim.key.clone()),
                IdempotencyRecord {
                    scope: claim.scope,
                    key: claim.key.clone(),
                    order_id,
                    created_at: Utc::now(),
                },
            );
        }

        debug!(order_id, positions = position_ids.len(), "Order saved in memory");
        Ok(persisted)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Repository Implementations
// =============================================================================

#[async_trait]
impl CatalogLookup for MemoryStore {
    async fn find_active(
        &self,
        ids: &[MenuItemId],
    ) -> Result<HashMap<MenuItemId, CatalogItem>, StoreError> {
        if self.fail_catalog.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("simulated catalog outage".to_string()));
        }

        let catalog = self.catalog.read().unwrap_or_else(|e| e.into_inner());
        Ok(ids
            .iter()
            .filter_map(|id| catalog.get(id))
            .filter(|item| item.active)
            .map(|item| (item.id, item.clone()))
            .collect())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn save(
        &self,
        order: &NewOrder,
        claim: Option<&IdempotencyClaim>,
    ) -> Result<Order, StoreError> {
        self.retry
            .run("save_order", move || async move { self.save_once(order, claim) })
            .await
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.lock_tables().orders.get(&id).cloned())
    }

    async fn find_by_token(&self, token: &OrderToken) -> Result<Option<Order>, StoreError> {
        let tables = self.lock_tables();
        Ok(tables
            .tokens
            .get(token.as_str())
            .and_then(|id| tables.orders.get(id))
            .cloned())
    }
}

#[async_trait]
impl IdempotencyRepository for MemoryStore {
    async fn find(
        &self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, StoreError> {
        Ok(self.lock_tables().idempotency.get(&(*scope, key.clone())).cloned())
    }
}

impl Store for MemoryStore {
    fn catalog(&self) -> &dyn CatalogLookup {
        self
    }

    fn orders(&self) -> &dyn OrderRepository {
        self
    }

    fn idempotency(&self) -> &dyn IdempotencyRepository {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use mensa_domain::{Address, Count, NewOrderPosition, OrderStatus, Phone};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn create_test_order(lines: usize) -> NewOrder {
        NewOrder {
            token: OrderToken::generate(),
            address: Address::new("Some address 1").unwrap(),
            phone: Phone::new("+491234567").unwrap(),
            user_id: None,
            status: OrderStatus::New,
            positions: (0..lines)
                .map(|i| NewOrderPosition {
                    menu_item_id: i as MenuItemId + 1,
                    name: format!("Item {}", i + 1),
                    count: Count::new(1).unwrap(),
                    price: dec!(4.50),
                    price_usd: dec!(4.86),
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    fn claim(key: &str) -> IdempotencyClaim {
        IdempotencyClaim::new(IdempotencyScope::Global, IdempotencyKey::new(key).unwrap())
    }

    // Catalog Tests
    #[tokio::test]
    async fn test_catalog_skips_inactive_and_unknown() {
        let store = MemoryStore::new().with_catalog([
            CatalogItem::active(1, "Espresso", dec!(2.50)),
            CatalogItem::inactive(2, "Seasonal", dec!(3.00)),
        ]);

        let found = store.find_active(&[1, 2, 3]).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[&1].name, "Espresso");
    }

    #[tokio::test]
    async fn test_catalog_failure() {
        let store = MemoryStore::new();
        store.set_fail_catalog(true);

        assert!(matches!(store.find_active(&[1]).await, Err(StoreError::Connection(_))));
    }

    // Order Repository Tests
    #[tokio::test]
    async fn test_save_assigns_ids_in_order() {
        let store = MemoryStore::new();
        let order = create_test_order(3);

        let saved = store.save(&order, None).await.unwrap();

        assert_eq!(saved.id, 1);
        assert_eq!(saved.positions.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(saved.positions.iter().all(|p| p.order_id == saved.id));
        assert_eq!(store.position_count(), 3);
    }

    #[tokio::test]
    async fn test_find_by_id_and_token() {
        let store = MemoryStore::new();
        let saved = store.save(&create_test_order(1), None).await.unwrap();

        let by_id = store.find_by_id(saved.id).await.unwrap().unwrap();
        let by_token = store.find_by_token(&saved.token).await.unwrap().unwrap();

        assert_eq!(by_id, saved);
        assert_eq!(by_token, saved);
        assert!(store.find_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_registers_claim() {
        let store = MemoryStore::new();
        let c = claim("abc");

        let saved = store.save(&create_test_order(1), Some(&c)).await.unwrap();
        let record = store.find(&c.scope, &c.key).await.unwrap().unwrap();

        assert_eq!(record.order_id, saved.id);
    }

    #[tokio::test]
    async fn test_duplicate_claim_writes_nothing() {
        let store = MemoryStore::new();
        let c = claim("abc");
        store.save(&create_test_order(1), Some(&c)).await.unwrap();

        let result = store.save(&create_test_order(2), Some(&c)).await;

        assert!(result.unwrap_err().is_duplicate());
        assert_eq!(store.order_count(), 1);
        assert_eq!(store.position_count(), 1);
        assert_eq!(store.idempotency_count(), 1);
    }

    #[tokio::test]
    async fn test_claims_are_scoped() {
        let store = MemoryStore::new();
        let key = IdempotencyKey::new("same").unwrap();

        let first = IdempotencyClaim::new(IdempotencyScope::User(1), key.clone());
        let second = IdempotencyClaim::new(IdempotencyScope::User(2), key.clone());

        store.save(&create_test_order(1), Some(&first)).await.unwrap();
        store.save(&create_test_order(1), Some(&second)).await.unwrap();

        assert_eq!(store.order_count(), 2);
        assert!(store.find(&IdempotencyScope::Global, &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_order_rejected() {
        let store = MemoryStore::new();

        let result = store.save(&create_test_order(0), None).await;

        assert!(matches!(result, Err(StoreError::Domain(_))));
        assert_eq!(store.order_count(), 0);
    }

    // Retry Tests
    #[tokio::test]
    async fn test_single_conflict_is_retried() {
        let store = MemoryStore::new();
        store.inject_conflicts(1);

        let saved = store.save(&create_test_order(2), None).await.unwrap();

        assert_eq!(store.save_attempts(), 2);
        assert_eq!(store.order_count(), 1);
        assert_eq!(saved.positions.len(), 2);
    }

    #[tokio::test]
    async fn test_conflicts_exhaust_attempts() {
        let store = MemoryStore::new();
        store.inject_conflicts(2);

        let result = store.save(&create_test_order(2), None).await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.save_attempts(), 2);
        assert_eq!(store.order_count(), 0);
        assert_eq!(store.position_count(), 0);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let store = MemoryStore::new();
        store.set_fail_saves(true);

        let result = store.save(&create_test_order(1), None).await;

        assert!(matches!(result, Err(StoreError::Database(_))));
        assert_eq!(store.save_attempts(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_claims_single_winner() {
        let store = Arc::new(MemoryStore::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.save(&create_test_order(1), Some(&claim("race"))).await
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(e) => assert!(e.is_duplicate()),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(store.order_count(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::new();
        store.save(&create_test_order(1), Some(&claim("k"))).await.unwrap();

        store.clear();

        assert_eq!(store.order_count(), 0);
        assert_eq!(store.idempotency_count(), 0);
    }
}
