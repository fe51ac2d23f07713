//! Demo menu seeding.
//!
//! Gives a fresh database (or the in-memory store) something to order from.

use mensa_domain::CatalogItem;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use super::Result;

/// The demo menu. Item 6 is inactive so that "not orderable" can be tried
/// against a freshly seeded catalog.
pub fn demo_menu() -> Vec<CatalogItem> {
    vec![
        CatalogItem::active(1, "Margherita", Decimal::new(850, 2)),
        CatalogItem::active(2, "Quattro Formaggi", Decimal::new(1090, 2)),
        CatalogItem::active(3, "Diavola", Decimal::new(970, 2)),
        CatalogItem::active(4, "Calzone", Decimal::new(1120, 2)),
        CatalogItem::active(5, "Tiramisu", Decimal::new(540, 2)),
        CatalogItem::inactive(6, "Seasonal Special", Decimal::new(1250, 2)),
    ]
}

/// Insert menu items by id.
///
/// Uses INSERT ... ON CONFLICT DO NOTHING for idempotency, so existing rows
/// (including edited prices) are left alone. Returns the number of rows
/// actually inserted.
pub async fn seed_menu(pool: &PgPool, items: &[CatalogItem]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for item in items {
        let result = sqlx::query(
            r#"
            INSERT INTO menu_items (id, name, price, active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.price)
        .bind(item.active)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    // Explicit ids bypass the sequence; move it past them.
    sqlx::query(
        r#"
        SELECT setval(
            pg_get_serial_sequence('menu_items', 'id'),
            GREATEST((SELECT COALESCE(MAX(id), 0) FROM menu_items), 1)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(inserted, total = items.len(), "Menu seeded");
    Ok(inserted)
}
