//! Order intake pipeline.
//!
//! ```text
//! Received ──(known key)──────────────────────────────► Persisted (replay)
//!    │
//!    ▼
//! Validated  (catalog lookup + rules)
//!    │
//!    ▼
//! Priced     (unit price converted once per distinct item)
//!    │
//!    ▼
//! Persisted  (one transaction: header, positions, idempotency key)
//! ```
//!
//! Nothing is written before `Persisted`. A lost idempotency race is resolved
//! by returning the winner's order.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use mensa_currency::CurrencyConverter;
use mensa_domain::{
    validate_submission, CatalogItem, Currency, IdempotencyKey, IdempotencyScope, MenuItemId,
    Order, OrderBuilder, OrderSubmission, OrderToken, PriceSheet, PricedItem, UserId,
    ValidatedOrder,
};
use mensa_store::{IdempotencyClaim, Store};

use crate::error::OrderError;

// =============================================================================
// Commands and Outcomes
// =============================================================================

/// One order submission as received.
#[derive(Debug, Clone)]
pub struct SubmitOrder {
    /// Request body
    pub submission: OrderSubmission,
    /// Client retry token, if any
    pub idempotency_key: Option<IdempotencyKey>,
    /// Authenticated caller, if any
    pub user_id: Option<UserId>,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A new order was persisted
    Created(Order),
    /// The idempotency key was already used; this is the earlier order
    Replayed(Order),
}

impl SubmitOutcome {
    /// The persisted order, whichever way it was obtained.
    pub fn order(&self) -> &Order {
        match self {
            SubmitOutcome::Created(order) | SubmitOutcome::Replayed(order) => order,
        }
    }

    /// Consume into the persisted order.
    pub fn into_order(self) -> Order {
        match self {
            SubmitOutcome::Created(order) | SubmitOutcome::Replayed(order) => order,
        }
    }

    /// True if this call created the order.
    pub fn is_created(&self) -> bool {
        matches!(self, SubmitOutcome::Created(_))
    }
}

// =============================================================================
// Order Service
// =============================================================================

/// Runs the intake pipeline against a store and a currency converter.
pub struct OrderService<S: Store + 'static> {
    store: Arc<S>,
    converter: Arc<dyn CurrencyConverter>,
    base: Currency,
    report: Currency,
}

impl<S: Store + 'static> OrderService<S> {
    /// Create a service pricing in `base` and reporting in `report`.
    pub fn new(
        store: Arc<S>,
        converter: Arc<dyn CurrencyConverter>,
        base: Currency,
        report: Currency,
    ) -> Self {
        Self {
            store,
            converter,
            base,
            report,
        }
    }

    /// Get the store (tests and the daemon share it).
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Accept a submission.
    ///
    /// # Errors
    /// - `Validation` for rule violations
    /// - `CatalogUnavailable` / `ConversionUnavailable` when a collaborator fails
    /// - `PersistenceFailed` when the write fails after retries
    pub async fn submit(&self, command: SubmitOrder) -> Result<SubmitOutcome, OrderError> {
        let SubmitOrder {
            submission,
            idempotency_key,
            user_id,
        } = command;

        let claim = idempotency_key
            .map(|key| IdempotencyClaim::new(IdempotencyScope::for_caller(user_id), key));

        // Received: a known key short-circuits to the stored order.
        if let Some(claim) = &claim {
            if let Some(order) = self.resolve(claim).await? {
                info!(
                    order_id = order.id,
                    scope = %claim.scope,
                    "Idempotent replay, returning existing order"
                );
                return Ok(SubmitOutcome::Replayed(order));
            }
        }

        // Validated
        let requested = submission.requested_item_ids();
        let catalog = if requested.is_empty() {
            HashMap::new()
        } else {
            self.store
                .catalog()
                .find_active(&requested)
                .await
                .map_err(OrderError::CatalogUnavailable)?
        };

        let validated = validate_submission(&submission, &catalog).map_err(|e| {
            debug!(fields = e.errors().len(), "Submission rejected");
            OrderError::Validation(e)
        })?;

        // Priced
        let prices = self.price_sheet(&validated, &catalog).await?;
        let order = OrderBuilder::new(&prices).build(&validated, user_id)?;

        // Persisted
        match self.store.orders().save(&order, claim.as_ref()).await {
            Ok(saved) => {
                info!(
                    order_id = saved.id,
                    positions = saved.positions.len(),
                    total = %saved.total(),
                    "Order created"
                );
                Ok(SubmitOutcome::Created(saved))
            },
            Err(e) if e.is_duplicate() => {
                let Some(claim) = &claim else {
                    return Err(OrderError::PersistenceFailed(e));
                };
                warn!(scope = %claim.scope, "Idempotency key taken concurrently, resolving winner");
                match self.resolve(claim).await? {
                    Some(order) => Ok(SubmitOutcome::Replayed(order)),
                    None => Err(OrderError::PersistenceFailed(e)),
                }
            },
            Err(e) => {
                warn!(error = %e, "Order persistence failed");
                Err(OrderError::PersistenceFailed(e))
            },
        }
    }

    /// Look up a persisted order by its public token. Never re-prices.
    pub async fn find_by_token(&self, token: &str) -> Result<Order, OrderError> {
        let not_found = || OrderError::NotFound(token.to_string());
        let token = OrderToken::parse(token).map_err(|_| not_found())?;

        self.store
            .orders()
            .find_by_token(&token)
            .await
            .map_err(OrderError::PersistenceFailed)?
            .ok_or_else(not_found)
    }

    /// Order previously registered under `claim`, if any.
    async fn resolve(&self, claim: &IdempotencyClaim) -> Result<Option<Order>, OrderError> {
        let Some(record) = self
            .store
            .idempotency()
            .find(&claim.scope, &claim.key)
            .await
            .map_err(OrderError::PersistenceFailed)?
        else {
            return Ok(None);
        };

        self.store
            .orders()
            .find_by_id(record.order_id)
            .await
            .map_err(OrderError::PersistenceFailed)
    }

    /// Snapshot name and both prices for every distinct validated item.
    async fn price_sheet(
        &self,
        validated: &ValidatedOrder,
        catalog: &HashMap<MenuItemId, CatalogItem>,
    ) -> Result<PriceSheet, OrderError> {
        let mut sheet = PriceSheet::new(self.base, self.report);

        for id in validated.item_ids() {
            let item = catalog
                .get(&id)
                .ok_or(mensa_domain::DomainError::MissingPrice(id))?;

            let price_usd = self
                .converter
                .convert(self.base, self.report, item.price)
                .await
                .map_err(|e| {
                    warn!(item_id = id, error = %e, "Currency conversion failed");
                    OrderError::ConversionUnavailable(e)
                })?;

            sheet.insert(
                id,
                PricedItem {
                    name: item.name.clone(),
                    price: item.price,
                    price_usd,
                },
            );
        }

        Ok(sheet)
    }
}

// =============================================================================
// Tests
// =============================================================================
