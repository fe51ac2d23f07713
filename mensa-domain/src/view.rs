//! Client-facing representation of a persisted order.
//!
//! Always derived from the stored `Order`, so a replayed submission renders
//! byte-for-byte the same payload as the first one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{MenuItemId, Order, OrderId, OrderStatus};

/// One rendered line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionView {
    /// Catalog item the line was ordered from
    pub position_id: MenuItemId,
    /// Ordered quantity
    pub count: i32,
    /// Unit price in the base currency
    pub price: Decimal,
    /// Unit price in the reporting currency
    #[serde(rename = "priceUSD")]
    pub price_usd: Decimal,
}

/// Rendered order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    /// Order id
    pub id: OrderId,
    /// Public order token
    pub token: String,
    /// Delivery address
    pub address: String,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Lines in persisted order
    pub positions: Vec<PositionView>,
    /// Sum of `price` over positions
    pub total: Decimal,
    /// Sum of `priceUSD` over positions
    #[serde(rename = "totalUSD")]
    pub total_usd: Decimal,
}

/// `{"data": ...}` wrapper used on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEnvelope {
    /// The rendered order
    pub data: OrderView,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            token: order.token.as_str().to_string(),
            address: order.address.as_str().to_string(),
            status: order.status,
            positions: order
                .positions
                .iter()
                .map(|p| PositionView {
                    position_id: p.menu_item_id,
                    count: p.count.get(),
                    price: p.price,
                    price_usd: p.price_usd,
                })
                .collect(),
            total: order.total(),
            total_usd: order.total_usd(),
        }
    }
}

impl From<OrderView> for OrderEnvelope {
    fn from(data: OrderView) -> Self {
        Self { data }
    }
}
