//! Unit of work: everything one command commits together.

use chrono::{DateTime, Utc};
use outbox::OutboxMessage;

use crate::aggregate::AggregateRoot;
use crate::capture::capture_events;
use crate::error::{DomainError, Result};
use crate::order::{Order, ProductId};

/// A stock decrement staged for commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReservation {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Changes staged by a single command.
///
/// A repository commits the staged orders, stock reservations and outbox
/// messages atomically, or nothing at all.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    new_orders: Vec<Order>,
    updated_orders: Vec<Order>,
    reservations: Vec<StockReservation>,
    outbox_messages: Vec<OutboxMessage>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a newly placed order.
    pub fn add_order(&mut self, order: Order) {
        self.new_orders.push(order);
    }

    /// Stages an existing order for overwrite.
    pub fn update_order(&mut self, order: Order) {
        self.updated_orders.push(order);
    }

    /// Stages a stock decrement.
    pub fn reserve_stock(&mut self, product_id: ProductId, quantity: u32) {
        self.reservations.push(StockReservation {
            product_id,
            quantity,
        });
    }

    /// Runs the capture hook on `aggregate` and stages the resulting messages.
    ///
    /// Returns the number of messages staged.
    pub fn capture<A: AggregateRoot>(&mut self, aggregate: &mut A, now: DateTime<Utc>) -> Result<usize> {
        let messages = capture_events(aggregate, now)?;
        let count = messages.len();
        self.outbox_messages.extend(messages);
        Ok(count)
    }

    pub fn new_orders(&self) -> &[Order] {
        &self.new_orders
    }

    pub fn updated_orders(&self) -> &[Order] {
        &self.updated_orders
    }

    pub fn reservations(&self) -> &[StockReservation] {
        &self.reservations
    }

    pub fn outbox_messages(&self) -> &[OutboxMessage] {
        &self.outbox_messages
    }

    pub fn is_empty(&self) -> bool {
        self.new_orders.is_empty()
            && self.updated_orders.is_empty()
            && self.reservations.is_empty()
            && self.outbox_messages.is_empty()
    }

    /// Fails if a staged order still holds events that were never captured.
    ///
    /// Repositories call this before writing anything.
    pub fn ensure_captured(&self) -> Result<()> {
        if let Some(order) = self
            .new_orders
            .iter()
            .chain(&self.updated_orders)
            .find(|order| order.has_pending_events())
        {
            return Err(DomainError::UncapturedEvents {
                aggregate_type: Order::aggregate_type(),
                aggregate_id: order.id().to_string(),
                count: order.pending_events().len(),
            });
        }
        Ok(())
    }

    /// Splits the unit of work into its staged parts.
    pub fn into_parts(self) -> UnitOfWorkParts {
        UnitOfWorkParts {
            new_orders: self.new_orders,
            updated_orders: self.updated_orders,
            reservations: self.reservations,
            outbox_messages: self.outbox_messages,
        }
    }
}

/// Owned contents of a [`UnitOfWork`], consumed by repositories at commit.
#[derive(Debug)]
pub struct UnitOfWorkParts {
    pub new_orders: Vec<Order>,
    pub updated_orders: Vec<Order>,
    pub reservations: Vec<StockReservation>,
    pub outbox_messages: Vec<OutboxMessage>,
}
