//! Domain Entities for Mensa
//!
//! The order aggregate in its two lifecycle shapes: `NewOrder` (built in
//! memory, no identity yet) and `Order` (persisted, identity assigned by
//! the store). Positions are owned by exactly one order.

use crate::value_objects::{
    Address, Count, DomainError, IdempotencyKey, IdempotencyScope, OrderToken, Phone,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of a persisted Order (assigned by the store)
pub type OrderId = i64;

/// Identifier of a persisted OrderPosition row
pub type PositionRowId = i64;

/// Identifier of a catalog (menu) item
pub type MenuItemId = i64;

/// Identifier of an authenticated caller
pub type UserId = i64;

// =============================================================================
// Order Status
// =============================================================================

/// Order status lifecycle
///
/// Intake only ever creates orders in `New`; later transitions belong to
/// fulfilment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Accepted, awaiting approval
    New,
    /// Approved by the kitchen
    Approved,
    /// Handed to the customer
    Delivered,
}

impl OrderStatus {
    /// Get status name as stored and rendered
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Approved => "approved",
            OrderStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(OrderStatus::New),
            "approved" => Ok(OrderStatus::Approved),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

// =============================================================================
// Catalog Item
// =============================================================================

/// A menu item as the catalog currently knows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Catalog id
    pub id: MenuItemId,
    /// Display name
    pub name: String,
    /// Unit price in the store's base currency
    pub price: Decimal,
    /// Only active items can be ordered
    pub active: bool,
}

impl CatalogItem {
    /// Create an active catalog item
    pub fn active(id: MenuItemId, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            active: true,
        }
    }

    /// Create an inactive catalog item
    pub fn inactive(id: MenuItemId, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            active: false,
            ..Self::active(id, name, price)
        }
    }
}

// =============================================================================
// New Order (pre-persistence)
// =============================================================================

/// Line item snapshotted at build time, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderPosition {
    /// Catalog item the line was ordered from
    pub menu_item_id: MenuItemId,
    /// Item name snapshotted at build time
    pub name: String,
    /// Ordered quantity
    pub count: Count,
    /// Unit price in the base currency
    pub price: Decimal,
    /// Unit price in the reporting currency
    pub price_usd: Decimal,
}

/// Order aggregate built in memory, ready for a single transactional write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Public order token
    pub token: OrderToken,
    /// Delivery address
    pub address: Address,
    /// Contact phone
    pub phone: Phone,
    pub user_id: Option<UserId>,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Lines in submission order
    pub positions: Vec<NewOrderPosition>,
    /// Build time
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Most positions one order may carry
    pub const MAX_POSITIONS: usize = 100;

    /// Check the positions invariant (1..=100)
    pub fn check_positions(&self) -> Result<(), DomainError> {
        let n = self.positions.len();
        if n == 0 || n > Self::MAX_POSITIONS {
            return Err(DomainError::InvalidPositionCount(n));
        }
        Ok(())
    }

    /// Attach store-assigned identifiers, producing the persisted shape.
    ///
    /// `position_ids` must be in the same order as `self.positions`.
    pub fn into_persisted(self, id: OrderId, position_ids: &[PositionRowId]) -> Order {
        let positions = self
            .positions
            .into_iter()
            .zip(position_ids.iter().copied())
            .map(|(p, row_id)| OrderPosition {
                id: row_id,
                order_id: id,
                menu_item_id: p.menu_item_id,
                name: p.name,
                count: p.count,
                price: p.price,
                price_usd: p.price_usd,
            })
            .collect();

        Order {
            id,
            token: self.token,
            address: self.address,
            phone: self.phone,
            user_id: self.user_id,
            status: self.status,
            positions,
            created_at: self.created_at,
        }
    }
}

// =============================================================================
// Order (persisted)
// =============================================================================

/// Persisted line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPosition {
    /// Row id; ascending in insertion order
    pub id: PositionRowId,
    /// Owning order
    pub order_id: OrderId,
    /// Catalog item the line was ordered from
    pub menu_item_id: MenuItemId,
    /// Item name snapshotted at build time
    pub name: String,
    /// Ordered quantity
    pub count: Count,
    /// Unit price in the base currency
    pub price: Decimal,
    /// Unit price in the reporting currency
    pub price_usd: Decimal,
}

/// Persisted order aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Database id
    pub id: OrderId,
    /// Public order token
    pub token: OrderToken,
    /// Delivery address
    pub address: Address,
    /// Contact phone
    pub phone: Phone,
    pub user_id: Option<UserId>,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Ordered by ascending position row id
    pub positions: Vec<OrderPosition>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Sum of base-currency prices over all positions
    pub fn total(&self) -> Decimal {
        self.positions.iter().map(|p| p.price).sum()
    }

    /// Sum of reporting-currency prices over all positions
    pub fn total_usd(&self) -> Decimal {
        self.positions.iter().map(|p| p.price_usd).sum()
    }
}

// =============================================================================
// Idempotency Record
// =============================================================================

/// Mapping from a client token to the order it created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    /// Namespace of the key
    pub scope: IdempotencyScope,
    /// Client-supplied key
    pub key: IdempotencyKey,
    /// Order created under this key
    pub order_id: OrderId,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_order(lines: usize) -> NewOrder {
        NewOrder {
            token: OrderToken::generate(),
            address: Address::new("Some address").unwrap(),
            phone: Phone::new("+7955441112").unwrap(),
            user_id: None,
            status: OrderStatus::New,
            positions: (0..lines)
                .map(|i| NewOrderPosition {
                    menu_item_id: i as i64 + 1,
                    name: format!("Item {}", i + 1),
                    count: Count::new(2).unwrap(),
                    price: dec!(4.50),
                    price_usd: dec!(4.86),
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_names() {
        assert_eq!(OrderStatus::New.as_str(), "new");
        assert_eq!("approved".parse::<OrderStatus>().unwrap(), OrderStatus::Approved);
        assert!("cancelled".parse::<OrderStatus>().is_err());
        assert_eq!(serde_json::to_string(&OrderStatus::Delivered).unwrap(), "\"delivered\"");
    }

    #[test]
    fn test_check_positions() {
        assert!(new_order(1).check_positions().is_ok());
        assert!(new_order(100).check_positions().is_ok());
        assert_eq!(new_order(0).check_positions(), Err(DomainError::InvalidPositionCount(0)));
        assert!(new_order(101).check_positions().is_err());
    }

    #[test]
    fn test_into_persisted_assigns_foreign_keys() {
        let draft = new_order(2);
        let token = draft.token.clone();

        let order = draft.into_persisted(42, &[7, 8]);

        assert_eq!(order.id, 42);
        assert_eq!(order.token, token);
        assert_eq!(order.positions.len(), 2);
        assert!(order.positions.iter().all(|p| p.order_id == 42));
        assert_eq!(order.positions[0].id, 7);
        assert_eq!(order.positions[1].id, 8);
    }

    #[test]
    fn test_totals() {
        let order = new_order(3).into_persisted(1, &[1, 2, 3]);

        assert_eq!(order.total(), dec!(13.50));
        assert_eq!(order.total_usd(), dec!(14.58));
    }

    #[test]
    fn test_catalog_item_constructors() {
        let item = CatalogItem::inactive(3, "Soup", dec!(3.20));
        assert!(!item.active);
        assert_eq!(item.name, "Soup");
        assert!(CatalogItem::active(1, "Tea", dec!(1)).active);
    }
}
