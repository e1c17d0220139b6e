//! Order service: command handlers for placing and progressing orders.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};
use common::{AggregateId, Clock, SystemClock};

use crate::aggregate::AggregateRoot;
use crate::catalog::Product;
use crate::command::Command;
use crate::error::{DomainError, Result};
use crate::repository::{OrderRepository, ProductRepository};
use crate::unit_of_work::UnitOfWork;

use super::{AdvanceOrderStatus, CreateOrder, Order, OrderError, ProductId, SetPaymentStatus};

/// Service for managing orders.
///
/// Each command runs in one unit of work: the order, any stock decrements
/// and the outbox messages captured from the order commit together.
pub struct OrderService<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S> OrderService<S, SystemClock> {
    /// Creates a new order service using the system clock.
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: SystemClock,
        }
    }
}

impl<S, C> OrderService<S, C>
where
    S: ProductRepository + OrderRepository,
    C: Clock,
{
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order from a cart, reserving stock for every line.
    ///
    /// Lines are checked in order and the first invalid one stops the
    /// command; nothing is stored in that case.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.aggregate_id(), lines = cmd.lines.len()))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order> {
        let now = self.clock.now();
        let mut uow = UnitOfWork::new();
        let mut products: HashMap<ProductId, Product> = HashMap::new();
        let mut items = Vec::with_capacity(cmd.lines.len());

        for line in &cmd.lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                }
                .into());
            }

            // Repeated lines for one product draw from the same remaining stock.
            let product = match products.entry(line.product_id.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let product = self.store.get_by_id(&line.product_id).await?.ok_or_else(|| {
                        OrderError::InvalidProductInBasket {
                            product_id: line.product_id.clone(),
                        }
                    })?;
                    entry.insert(product)
                }
            };

            product.reserve(line.quantity)?;
            items.push(product.to_order_item(line.quantity));
            uow.reserve_stock(product.id.clone(), line.quantity);
        }

        let mut order = Order::place(cmd.order_id, cmd.buyer, items, now)?;
        uow.capture(&mut order, now)?;
        uow.add_order(order.clone());
        self.store.commit(uow).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(total = %order.total(), "order placed");
        Ok(order)
    }

    /// Records the result of a payment attempt.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.aggregate_id(), success = cmd.success))]
    pub async fn set_payment_status(&self, cmd: SetPaymentStatus) -> Result<Order> {
        let mut order = self.load(cmd.order_id).await?;
        let now = self.clock.now();

        order.set_payment_status(cmd.success, cmd.payment_intent_id.as_deref(), now)?;
        let order = self.save(order, now).await?;

        let outcome = if cmd.success { "succeeded" } else { "failed" };
        metrics::counter!("order_payments_total", "outcome" => outcome).increment(1);
        tracing::info!(outcome, "payment status recorded");
        Ok(order)
    }

    /// Moves an order along its fulfilment or refund path.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.aggregate_id(), status = %cmd.status))]
    pub async fn advance_status(&self, cmd: AdvanceOrderStatus) -> Result<Order> {
        let mut order = self.load(cmd.order_id).await?;
        let now = self.clock.now();

        order.advance_status(cmd.status, cmd.notes, now)?;
        self.save(order, now).await
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: AggregateId) -> Result<Option<Order>> {
        self.store.get(order_id).await
    }

    async fn load(&self, order_id: AggregateId) -> Result<Order> {
        self.store
            .get(order_id)
            .await?
            .ok_or_else(|| DomainError::AggregateNotFound {
                aggregate_type: Order::aggregate_type(),
                aggregate_id: order_id.to_string(),
            })
    }

    async fn save(&self, mut order: Order, now: DateTime<Utc>) -> Result<Order> {
        let mut uow = UnitOfWork::new();
        uow.capture(&mut order, now)?;
        uow.update_order(order.clone());
        self.store.commit(uow).await?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use common::FixedClock;
    use outbox::OutboxStore;

    use super::*;
    use crate::memory::InMemoryShopStore;
    use crate::order::{Address, Buyer, CartLine, Money, OrderStatus};

    fn buyer() -> Buyer {
        Buyer::new(
            "jane@example.com",
            "+1 555 0100",
            "Jane Doe",
            Address::new("1 Main St", "Springfield", "IL", "62701"),
        )
    }

    async fn service() -> OrderService<InMemoryShopStore, FixedClock> {
        let store = InMemoryShopStore::new()
            .with_products([
                Product::new("SKU-001", "Widget", Money::from_cents(1000), 5, "/img/w.png"),
                Product::new("SKU-002", "Gadget", Money::from_cents(250), 10, "/img/g.png"),
            ])
            .await;
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        OrderService::with_clock(store, clock)
    }

    #[tokio::test]
    async fn create_order_reserves_stock_and_captures_order_placed() {
        let service = service().await;
        let cmd = CreateOrder::new(
            buyer(),
            vec![CartLine::new("SKU-001", 2), CartLine::new("SKU-002", 4)],
        );

        let order = service.create_order(cmd).await.unwrap();

        assert_eq!(order.total(), Money::from_cents(3000));
        assert_eq!(order.status(), OrderStatus::PaymentPending);
        assert!(order.pending_events().is_empty());

        let store = service.store();
        assert_eq!(store.stock_of(&ProductId::new("SKU-001")).await, Some(3));
        assert_eq!(store.stock_of(&ProductId::new("SKU-002")).await, Some(6));

        let messages = store.outbox().all().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_type, "OrderPlaced");
    }

    #[tokio::test]
    async fn repeated_lines_share_remaining_stock() {
        let service = service().await;
        let cmd = CreateOrder::new(
            buyer(),
            vec![CartLine::new("SKU-001", 3), CartLine::new("SKU-001", 3)],
        );

        let result = service.create_order(cmd).await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::NotEnoughStock { stock: 2, requested: 3, .. }))
        ));
        assert_eq!(service.store().stock_of(&ProductId::new("SKU-001")).await, Some(5));
    }

    #[tokio::test]
    async fn zero_quantity_line_is_rejected() {
        let service = service().await;
        let cmd = CreateOrder::new(buyer(), vec![CartLine::new("SKU-001", 0)]);

        let result = service.create_order(cmd).await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::InvalidQuantity { .. }))
        ));
    }

    #[tokio::test]
    async fn empty_cart_is_rejected() {
        let service = service().await;

        let result = service.create_order(CreateOrder::new(buyer(), vec![])).await;

        assert!(matches!(result, Err(DomainError::Order(OrderError::NoItems))));
        assert_eq!(service.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn payment_success_captures_payment_confirmed() {
        let service = service().await;
        let order = service
            .create_order(CreateOrder::new(buyer(), vec![CartLine::new("SKU-001", 1)]))
            .await
            .unwrap();

        let order = service
            .set_payment_status(SetPaymentStatus::succeeded(order.id(), "pi_123"))
            .await
            .unwrap();

        assert_eq!(order.payment_intent_id(), Some("pi_123"));
        let stored = service.get_order(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::PaymentSucceeded);

        let types: Vec<_> = service
            .store()
            .outbox()
            .all()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.message_type)
            .collect();
        assert_eq!(types, vec!["OrderPlaced", "PaymentConfirmed"]);
    }

    #[tokio::test]
    async fn failed_payment_stores_history_without_event() {
        let service = service().await;
        let order = service
            .create_order(CreateOrder::new(buyer(), vec![CartLine::new("SKU-001", 1)]))
            .await
            .unwrap();

        service
            .set_payment_status(SetPaymentStatus::failed(order.id()))
            .await
            .unwrap();

        let stored = service.get_order(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::PaymentFailed);
        assert_eq!(service.store().outbox().message_count().await, 1);
    }

    #[tokio::test]
    async fn payment_for_unknown_order_is_not_found() {
        let service = service().await;

        let result = service
            .set_payment_status(SetPaymentStatus::succeeded(AggregateId::new(), "pi_1"))
            .await;

        assert!(matches!(result, Err(DomainError::AggregateNotFound { .. })));
    }

    #[tokio::test]
    async fn advance_status_uses_clock() {
        let service = service().await;
        let order = service
            .create_order(CreateOrder::new(buyer(), vec![CartLine::new("SKU-002", 1)]))
            .await
            .unwrap();
        service
            .set_payment_status(SetPaymentStatus::succeeded(order.id(), "pi_1"))
            .await
            .unwrap();

        let order = service
            .advance_status(
                AdvanceOrderStatus::new(order.id(), OrderStatus::Processing).with_notes("packing"),
            )
            .await
            .unwrap();

        let last = order.history().last().unwrap();
        assert_eq!(last.status, OrderStatus::Processing);
        assert_eq!(last.notes.as_deref(), Some("packing"));
        assert_eq!(last.timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    }
}
