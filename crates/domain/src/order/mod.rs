//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod status;
mod value_objects;

pub use aggregate::Order;
pub use commands::*;
pub use events::{OrderEvent, OrderPlaced, PaymentConfirmed};
pub use service::OrderService;
pub use status::{OrderHistoryEntry, OrderStatus, UnknownOrderStatus};
pub use value_objects::{Address, Buyer, CustomerId, Money, OrderItem, ProductId};

use common::AggregateId;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    #[error("Invalid quantity: {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// A cart line refers to a product that does not exist.
    #[error("Invalid product in basket: {product_id}")]
    InvalidProductInBasket { product_id: ProductId },

    /// A cart line asks for more than the product has in stock.
    #[error("Not enough stock for {product_name} ({product_id}): requested {requested}, in stock {stock}")]
    NotEnoughStock {
        product_id: ProductId,
        product_name: String,
        stock: u32,
        requested: u32,
    },

    /// A successful payment was reported without a payment intent id.
    #[error("Payment intent id is required for a successful payment")]
    InvalidPaymentIntentId,

    /// The payment result was already recorded.
    #[error("Payment for order {order_id} was already processed (status: {status})")]
    PaymentAlreadyProcessed {
        order_id: AggregateId,
        status: OrderStatus,
    },

    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },
}
