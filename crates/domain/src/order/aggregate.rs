//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateRoot;

use super::{
    Address, Buyer, CustomerId, Money, OrderError, OrderEvent, OrderHistoryEntry, OrderItem,
    OrderStatus,
    events::{OrderPlaced, PaymentConfirmed},
};

/// Order aggregate root.
///
/// Line items and the total are fixed when the order is placed. The status
/// lives in an append-only history whose last entry is the current status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: AggregateId,
    buyer: Buyer,
    items: Vec<OrderItem>,
    history: Vec<OrderHistoryEntry>,
    payment_intent_id: Option<String>,
    total: Money,

    #[serde(skip)]
    pending_events: Vec<OrderEvent>,
}

impl AggregateRoot for Order {
    type Event = OrderEvent;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn pending_events(&self) -> &[OrderEvent] {
        &self.pending_events
    }

    fn clear_events(&mut self) {
        self.pending_events.clear();
    }
}

impl Order {
    /// Places a new order.
    ///
    /// Starts the history with a `PaymentPending` entry and raises
    /// `OrderPlaced`.
    pub fn place(
        id: AggregateId,
        buyer: Buyer,
        items: Vec<OrderItem>,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            });
        }

        let total = items.iter().map(OrderItem::total_price).sum();
        let mut order = Self {
            id,
            buyer,
            items,
            history: vec![OrderHistoryEntry::new(
                OrderStatus::PaymentPending,
                now,
                None,
            )],
            payment_intent_id: None,
            total,
            pending_events: Vec::new(),
        };

        order.raise(OrderPlaced {
            order_id: id,
            customer_email: order.buyer.email.clone(),
            total,
        });
        Ok(order)
    }

    // Query methods

    pub fn email(&self) -> &str {
        &self.buyer.email
    }

    pub fn phone_number(&self) -> &str {
        &self.buyer.phone_number
    }

    pub fn full_name(&self) -> &str {
        &self.buyer.full_name
    }

    pub fn address(&self) -> &Address {
        &self.buyer.address
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.buyer.customer_id
    }

    pub fn buyer(&self) -> &Buyer {
        &self.buyer
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn history(&self) -> &[OrderHistoryEntry] {
        &self.history
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent_id.as_deref()
    }

    /// Returns the total fixed when the order was placed.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Returns the current status (the last history entry).
    pub fn status(&self) -> OrderStatus {
        self.history
            .last()
            .map(|entry| entry.status)
            .unwrap_or_default()
    }

    // Transitions

    /// Records the result of a payment attempt.
    ///
    /// Only legal while the order is `PaymentPending` or `PaymentFailed`. A
    /// successful payment requires a non-blank payment intent id and raises
    /// `PaymentConfirmed`; a failed one leaves the order open for another
    /// attempt.
    pub fn set_payment_status(
        &mut self,
        success: bool,
        payment_intent_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        let status = self.status();
        if !status.accepts_payment_result() {
            return Err(OrderError::PaymentAlreadyProcessed {
                order_id: self.id,
                status,
            });
        }

        if !success {
            self.push_history(OrderStatus::PaymentFailed, None, now);
            return Ok(());
        }

        let payment_intent_id = payment_intent_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(OrderError::InvalidPaymentIntentId)?;

        self.payment_intent_id = Some(payment_intent_id.to_string());
        self.push_history(OrderStatus::PaymentSucceeded, None, now);
        self.raise(PaymentConfirmed {
            order_id: self.id,
            customer_email: self.buyer.email.clone(),
        });
        Ok(())
    }

    /// Moves the order along its fulfilment or refund path.
    pub fn advance_status(
        &mut self,
        next: OrderStatus,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        let current = self.status();
        if !current.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                from: current,
                to: next,
            });
        }

        self.push_history(next, notes, now);
        Ok(())
    }

    fn push_history(&mut self, status: OrderStatus, notes: Option<String>, now: DateTime<Utc>) {
        self.history.push(OrderHistoryEntry::new(status, now, notes));
    }

    fn raise(&mut self, event: impl Into<OrderEvent>) {
        self.pending_events.push(event.into());
    }
}
