//! PostgreSQL store.
//!
//! This module uses dynamic queries (sqlx::query) instead of compile-time
//! checked macros (sqlx::query!) to allow compilation without DATABASE_URL.
//!
//! A save is one transaction: the order header is inserted first so that
//! its generated id can be written into every position row, then the
//! idempotency key is registered. A unique violation on the key rolls the
//! whole transaction back.

use crate::error::{StoreError, UNIQUE_VIOLATION};
use crate::repository::{
    CatalogLookup, IdempotencyClaim, IdempotencyRepository, OrderRepository, Store,
};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mensa_domain::{
    Address, CatalogItem, Count, IdempotencyKey, IdempotencyRecord, IdempotencyScope, MenuItemId,
    NewOrder, Order, OrderId, OrderPosition, OrderStatus, OrderToken, Phone, PositionRowId,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tracing::debug;

/// PostgreSQL implementation of every repository.
pub struct PgStore {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PgStore {
    /// Create a store with the default retry policy.
    pub fn new(pool: PgPool) -> Self {
        Self::with_retry(pool, RetryPolicy::default())
    }

    /// Create a store with a custom retry policy.
    pub fn with_retry(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    /// Get a reference to the underlying pool (for testing).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// One transaction attempt. Dropping `tx` on any early return rolls back.
    async fn save_once(
        &self,
        order: &NewOrder,
        claim: Option<&IdempotencyClaim>,
    ) -> Result<Order, StoreError> {
        order.check_positions()?;

        let mut tx = self.pool.begin().await?;

        let order_id: OrderId = sqlx::query_scalar(
            r#"
            INSERT INTO orders (token, address, phone, user_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(order.token.as_str())
        .bind(order.address.as_str())
        .bind(order.phone.as_str())
        .bind(order.user_id)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let mut position_ids: Vec<PositionRowId> = Vec::with_capacity(order.positions.len());
        for position in &order.positions {
            let id: PositionRowId = sqlx::query_scalar(
                r#"
                INSERT INTO order_positions (order_id, menu_item_id, name, count, price, price_usd)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(order_id)
            .bind(position.menu_item_id)
            .bind(&position.name)
            .bind(position.count.get())
            .bind(position.price)
            .bind(position.price_usd)
            .fetch_one(&mut *tx)
            .await?;
            position_ids.push(id);
        }

        if let Some(claim) = claim {
            let result = sqlx::query(
                r#"
                INSERT INTO idempotency_keys (scope, key, order_id, created_at)
                VALUES ($1, $2, $3, NOW())
                "#,
            )
            .bind(claim.scope.to_string())
            .bind(claim.key.as_str())
            .bind(order_id)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {},
                Err(sqlx::Error::Database(db_err)) if is_unique_violation(db_err.as_ref()) => {
                    return Err(StoreError::duplicate("idempotency_key", claim.key.as_str()));
                },
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit().await?;

        debug!(order_id, positions = position_ids.len(), "Order committed");
        Ok(order.clone().into_persisted(order_id, &position_ids))
    }

    async fn load_positions(&self, order_id: OrderId) -> Result<Vec<OrderPosition>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, menu_item_id, name, count, price, price_usd
            FROM order_positions
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_position_row).collect()
    }

    async fn load_order(
        &self,
        row: Option<sqlx::postgres::PgRow>,
    ) -> Result<Option<Order>, StoreError> {
        let Some(row) = row else {
            return Ok(None);
        };

        let header = parse_order_row(&row)?;
        let positions = self.load_positions(header.id).await?;

        Ok(Some(header.into_order(positions)?))
    }
}

/// Check if database error is a unique constraint violation
fn is_unique_violation(db_err: &dyn sqlx::error::DatabaseError) -> bool {
    db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
}

// =============================================================================
// Row Parsing
// =============================================================================

/// Row struct for `orders` query results.
#[derive(Debug)]
struct OrderRow {
    id: OrderId,
    token: String,
    address: String,
    phone: String,
    user_id: Option<i64>,
    status: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, positions: Vec<OrderPosition>) -> Result<Order, StoreError> {
        Ok(Order {
            id: self.id,
            token: OrderToken::parse(&self.token)?,
            address: Address::new(&self.address)?,
            phone: Phone::new(&self.phone)?,
            user_id: self.user_id,
            status: self
                .status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::Deserialization(e.to_string()))?,
            positions,
            created_at: self.created_at,
        })
    }
}

fn parse_order_row(row: &sqlx::postgres::PgRow) -> Result<OrderRow, StoreError> {
    Ok(OrderRow {
        id: row.try_get("id")?,
        token: row.try_get("token")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
        user_id: row.try_get("user_id")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn parse_position_row(row: &sqlx::postgres::PgRow) -> Result<OrderPosition, StoreError> {
    let count: i32 = row.try_get("count")?;

    Ok(OrderPosition {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        menu_item_id: row.try_get("menu_item_id")?,
        name: row.try_get("name")?,
        count: Count::new(i64::from(count))?,
        price: row.try_get::<Decimal, _>("price")?,
        price_usd: row.try_get::<Decimal, _>("price_usd")?,
    })
}

// =============================================================================
// Repository Implementations
// =============================================================================

#[async_trait]
impl CatalogLookup for PgStore {
    async fn find_active(
        &self,
        ids: &[MenuItemId],
    ) -> Result<HashMap<MenuItemId, CatalogItem>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, name, price, active
            FROM menu_items
            WHERE id = ANY($1) AND active
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<(MenuItemId, CatalogItem), StoreError> {
                let item = CatalogItem {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    price: row.try_get("price")?,
                    active: row.try_get("active")?,
                };
                Ok((item.id, item))
            })
            .collect()
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn save(
        &self,
        order: &NewOrder,
        claim: Option<&IdempotencyClaim>,
    ) -> Result<Order, StoreError> {
        self.retry
            .run("save_order", move || self.save_once(order, claim))
            .await
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, token, address, phone, user_id, status, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.load_order(row).await
    }

    async fn find_by_token(&self, token: &OrderToken) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, token, address, phone, user_id, status, created_at
            FROM orders
            WHERE token = $1
            "#,
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await?;

        self.load_order(row).await
    }
}

#[async_trait]
impl IdempotencyRepository for PgStore {
    async fn find(
        &self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT order_id, created_at
            FROM idempotency_keys
            WHERE scope = $1 AND key = $2
            "#,
        )
        .bind(scope.to_string())
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<IdempotencyRecord, StoreError> {
            Ok(IdempotencyRecord {
                scope: *scope,
                key: key.clone(),
                order_id: row.try_get("order_id")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }
}

impl Store for PgStore {
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
