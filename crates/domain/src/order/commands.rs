//! Order commands.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::command::Command;

use super::{Buyer, Order, OrderStatus, ProductId};

/// One line of a submitted cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Command to place an order from a cart.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The order ID to create.
    pub order_id: AggregateId,
    pub buyer: Buyer,
    pub lines: Vec<CartLine>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command with a generated order ID.
    pub fn new(buyer: Buyer, lines: Vec<CartLine>) -> Self {
        Self {
            order_id: AggregateId::new(),
            buyer,
            lines,
        }
    }

    pub fn with_order_id(mut self, order_id: AggregateId) -> Self {
        self.order_id = order_id;
        self
    }
}

impl Command for CreateOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to record the result of a payment attempt.
#[derive(Debug, Clone)]
pub struct SetPaymentStatus {
    pub order_id: AggregateId,
    pub success: bool,
    pub payment_intent_id: Option<String>,
}

impl SetPaymentStatus {
    pub fn new(order_id: AggregateId, success: bool, payment_intent_id: Option<String>) -> Self {
        Self {
            order_id,
            success,
            payment_intent_id,
        }
    }

    /// A successful payment backed by the given payment intent.
    pub fn succeeded(order_id: AggregateId, payment_intent_id: impl Into<String>) -> Self {
        Self::new(order_id, true, Some(payment_intent_id.into()))
    }

    /// A failed payment attempt.
    pub fn failed(order_id: AggregateId) -> Self {
        Self::new(order_id, false, None)
    }
}

impl Command for SetPaymentStatus {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to move an order along its fulfilment or refund path.
#[derive(Debug, Clone)]
pub struct AdvanceOrderStatus {
    pub order_id: AggregateId,
    pub status: OrderStatus,
    pub notes: Option<String>,
}

impl AdvanceOrderStatus {
    pub fn new(order_id: AggregateId, status: OrderStatus) -> Self {
        Self {
            order_id,
            status,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl Command for AdvanceOrderStatus {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}
