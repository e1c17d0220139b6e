//! Order domain events.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::{DomainEvent, EventShape};

use super::Money;

/// Raised when an order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: AggregateId,
    pub customer_email: String,
    pub total: Money,
}

impl EventShape for OrderPlaced {
    const EVENT_TYPE: &'static str = "OrderPlaced";
}

/// Raised when a payment for an order succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmed {
    pub order_id: AggregateId,
    pub customer_email: String,
}

impl EventShape for PaymentConfirmed {
    const EVENT_TYPE: &'static str = "PaymentConfirmed";
}

/// All events raised by the Order aggregate.
///
/// Serialized untagged: the stored content is the bare payload and the
/// variant travels separately as the message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    PaymentConfirmed(PaymentConfirmed),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => OrderPlaced::EVENT_TYPE,
            OrderEvent::PaymentConfirmed(_) => PaymentConfirmed::EVENT_TYPE,
        }
    }
}

impl OrderEvent {
    /// Returns the order this event belongs to.
    pub fn order_id(&self) -> AggregateId {
        match self {
            OrderEvent::OrderPlaced(e) => e.order_id,
            OrderEvent::PaymentConfirmed(e) => e.order_id,
        }
    }
}

impl From<OrderPlaced> for OrderEvent {
    fn from(event: OrderPlaced) -> Self {
        OrderEvent::OrderPlaced(event)
    }
}

impl From<PaymentConfirmed> for OrderEvent {
    fn from(event: PaymentConfirmed) -> Self {
        OrderEvent::PaymentConfirmed(event)
    }
}
