//! Test helper functions for database seeding and fixtures.

use anyhow::Result;
use mensa_domain::{MenuItemId, OrderSubmission};
use serde_json::{json, Value};
use sqlx::PgPool;

/// Seed the demo menu (items 1-5 active, 6 inactive).
pub async fn seed_demo_menu(pool: &PgPool) -> Result<()> {
    mensa_db::seed_menu(pool, &mensa_db::demo_menu()).await?;
    Ok(())
}

/// The request body used throughout the API tests: two demo items.
pub fn sample_request() -> Value {
    json!({
        "address": "Some address 12",
        "phone": "+7955441112",
        "positions": [
            { "id": 1, "count": 1 },
            { "id": 2, "count": 2 },
        ]
    })
}

/// Build a well-formed submission body for arbitrary lines.
pub fn submission_json(address: &str, phone: &str, lines: &[(MenuItemId, i64)]) -> Value {
    serde_json::to_value(OrderSubmission::new(address, phone, lines))
        .unwrap_or_else(|_| json!({}))
}

/// Row counts across the order tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCounts {
    /// Rows in `orders`
    pub orders: i64,
    /// Rows in `order_positions`
    pub positions: i64,
    /// Rows in `idempotency_keys`
    pub idempotency_keys: i64,
}

/// Count rows in the order tables.
pub async fn count_rows(pool: &PgPool) -> Result<RowCounts> {
    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(pool).await?;
    let positions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM order_positions").fetch_one(pool).await?;
    let idempotency_keys: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM idempotency_keys").fetch_one(pool).await?;

    Ok(RowCounts {
        orders,
        positions,
        idempotency_keys,
    })
}
