//! Mensa Domain Layer
//!
//! Pure order-intake logic with zero I/O dependencies.
//! Contains value objects, the order aggregate, submission validation,
//! and the builder that turns a validated submission into an unsaved order.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod builder;
pub mod entities;
pub mod submission;
pub mod value_objects;
pub mod view;

// Re-export commonly used types
pub use builder::{round_money, OrderBuilder, PriceSheet, PricedItem, MONEY_SCALE};
pub use entities::{
    CatalogItem, IdempotencyRecord, MenuItemId, NewOrder, NewOrderPosition, Order, OrderId,
    OrderPosition, OrderStatus, PositionRowId, UserId,
};
pub use submission::{
    validate_submission, OrderSubmission, RequestedLine, ValidatedOrder, ValidationError,
};
pub use value_objects::{
    Address, Count, Currency, DomainError, IdempotencyKey, IdempotencyScope, OrderToken, Phone,
};
pub use view::{OrderEnvelope, OrderView, PositionView};
