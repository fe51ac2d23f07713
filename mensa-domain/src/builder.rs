//! Order builder: validated submission + price sheet → unsaved order.
//!
//! Pure apart from token randomness. Every price on the resulting positions
//! is copied from the sheet at build time; nothing downstream re-reads the
//! catalog.

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;

use crate::entities::{MenuItemId, NewOrder, NewOrderPosition, OrderStatus, UserId};
use crate::submission::ValidatedOrder;
use crate::value_objects::{Currency, DomainError, OrderToken};

/// Decimal places kept on monetary amounts
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to cents, midpoint away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Price Sheet
// =============================================================================

/// Snapshot of one item's name and prices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedItem {
    /// Display name at pricing time
    pub name: String,
    /// Unit price in the base currency
    pub price: Decimal,
    /// Unit price in the reporting currency
    pub price_usd: Decimal,
}

/// Catalog and rate data resolved for one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSheet {
    base: Currency,
    report: Currency,
    items: HashMap<MenuItemId, PricedItem>,
}

impl PriceSheet {
    /// Create an empty sheet for a currency pair
    pub fn new(base: Currency, report: Currency) -> Self {
        Self {
            base,
            report,
            items: HashMap::new(),
        }
    }

    /// Add or replace an item
    pub fn insert(&mut self, id: MenuItemId, item: PricedItem) {
        self.items.insert(id, item);
    }

    /// Look up an item
    pub fn get(&self, id: MenuItemId) -> Option<&PricedItem> {
        self.items.get(&id)
    }

    /// Base currency the `price` column is expressed in
    pub fn base(&self) -> Currency {
        self.base
    }

    /// Reporting currency the `price_usd` column is expressed in
    pub fn report(&self) -> Currency {
        self.report
    }

    /// Number of priced items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if no item is priced
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Order Builder
// =============================================================================

/// Turns a validated submission into a `NewOrder`
pub struct OrderBuilder<'a> {
    prices: &'a PriceSheet,
}

impl<'a> OrderBuilder<'a> {
    /// Create a builder over a resolved price sheet
    pub fn new(prices: &'a PriceSheet) -> Self {
        Self { prices }
    }

    /// Build the in-memory order with a fresh token and status `new`.
    ///
    /// # Errors
    /// - `DomainError::MissingPrice` if a line refers to an unpriced item
    /// - `DomainError::InvalidPositionCount` if there are no lines or more than 100
    pub fn build(
        &self,
        validated: &ValidatedOrder,
        user_id: Option<UserId>,
    ) -> Result<NewOrder, DomainError> {
        let positions = validated
            .lines
            .iter()
            .map(|line| {
                let item = self
                    .prices
                    .get(line.item_id)
                    .ok_or(DomainError::MissingPrice(line.item_id))?;

                Ok(NewOrderPosition {
                    menu_item_id: line.item_id,
                    name: item.name.clone(),
                    count: line.count,
                    price: item.price,
                    price_usd: item.price_usd,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let order = NewOrder {
            token: OrderToken::generate(),
            address: validated.address.clone(),
            phone: validated.phone.clone(),
            user_id,
            status: OrderStatus::New,
            positions,
            created_at: Utc::now(),
        };
        order.check_positions()?;

        Ok(order)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CatalogItem;
    use crate::submission::{validate_submission, OrderSubmission};
    use rust_decimal_macros::dec;

    fn sheet() -> PriceSheet {
        let mut sheet = PriceSheet::new(Currency::EUR, Currency::USD);
        sheet.insert(
            1,
            PricedItem {
                name: "Borscht".to_string(),
                price: dec!(4.50),
                price_usd: dec!(4.86),
            },
        );
        sheet.insert(
            2,
            PricedItem {
                name: "Pelmeni".to_string(),
                price: dec!(6.20),
                price_usd: dec!(6.70),
            },
        );
        sheet
    }

    fn validated(lines: &[(i64, i64)]) -> ValidatedOrder {
        let catalog = [
            CatalogItem::active(1, "Borscht", dec!(4.50)),
            CatalogItem::active(2, "Pelmeni", dec!(6.20)),
            CatalogItem::active(9, "Kvass", dec!(2.00)),
        ]
        .into_iter()
        .map(|i| (i.id, i))
        .collect();
        validate_submission(&OrderSubmission::new("Some address", "+7955441112", lines), &catalog)
            .unwrap()
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec!(4.865)), dec!(4.87));
        assert_eq!(round_money(dec!(4.8649)), dec!(4.86));
        assert_eq!(round_money(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn test_build_snapshots_prices() {
        let prices = sheet();
        let order = OrderBuilder::new(&prices)
            .build(&validated(&[(1, 1), (2, 2)]), Some(5))
            .unwrap();

        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.user_id, Some(5));
        assert_eq!(order.positions.len(), 2);
        assert_eq!(order.positions[0].name, "Borscht");
        assert_eq!(order.positions[0].price, dec!(4.50));
        assert_eq!(order.positions[1].price_usd, dec!(6.70));
        assert_eq!(order.positions[1].count.get(), 2);
    }

    #[test]
    fn test_build_generates_distinct_tokens() {
        let prices = sheet();
        let builder = OrderBuilder::new(&prices);
        let input = validated(&[(1, 1)]);

        let a = builder.build(&input, None).unwrap();
        let b = builder.build(&input, None).unwrap();

        assert_ne!(a.token, b.token);
        assert_eq!(a.user_id, None);
    }

    #[test]
    fn test_build_fails_on_unpriced_item() {
        let prices = sheet();
        let err = OrderBuilder::new(&prices)
            .build(&validated(&[(1, 1), (9, 1)]), None)
            .unwrap_err();

        assert_eq!(err, DomainError::MissingPrice(9));
    }

    #[test]
    fn test_sheet_accessors() {
        let prices = sheet();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices.base(), Currency::EUR);
        assert_eq!(prices.report(), Currency::USD);
        assert!(prices.get(3).is_none());
        assert!(!prices.is_empty());
    }
}
