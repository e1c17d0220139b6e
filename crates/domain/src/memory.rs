//! In-memory shop store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use outbox::{InMemoryOutboxStore, OutboxStore};
use tokio::sync::RwLock;

use crate::aggregate::AggregateRoot;
use crate::catalog::Product;
use crate::error::{DomainError, Result};
use crate::order::{Order, OrderError, ProductId};
use crate::repository::{OrderRepository, ProductRepository};
use crate::unit_of_work::UnitOfWork;

#[derive(Default)]
struct ShopState {
    products: HashMap<ProductId, Product>,
    orders: HashMap<AggregateId, Order>,
}

/// In-memory products and orders, committing outbox messages through `O`.
///
/// A commit holds the state lock for its whole duration. Everything is
/// validated first, then the outbox append runs as the one fallible step,
/// and only after it succeeds are orders and stock written. Clones share
/// the same state.
#[derive(Clone)]
pub struct InMemoryShopStore<O = InMemoryOutboxStore> {
    state: Arc<RwLock<ShopState>>,
    outbox: O,
}

impl InMemoryShopStore {
    /// Creates an empty store backed by an in-memory outbox.
    pub fn new() -> Self {
        Self::with_outbox(InMemoryOutboxStore::new())
    }
}

impl Default for InMemoryShopStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: OutboxStore> InMemoryShopStore<O> {
    pub fn with_outbox(outbox: O) -> Self {
        Self {
            state: Arc::new(RwLock::new(ShopState::default())),
            outbox,
        }
    }

    /// Gets a reference to the outbox the store commits into.
    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    pub async fn with_products(self, products: impl IntoIterator<Item = Product>) -> Self {
        {
            let mut state = self.state.write().await;
            for product in products {
                state.products.insert(product.id.clone(), product);
            }
        }
        self
    }

    /// Returns the current stock of a product.
    pub async fn stock_of(&self, id: &ProductId) -> Option<u32> {
        self.state.read().await.products.get(id).map(|p| p.stock)
    }

    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

fn validate_reservations(
    state: &ShopState,
    unit_of_work: &UnitOfWork,
) -> Result<HashMap<ProductId, u32>> {
    let mut totals: HashMap<ProductId, u32> = HashMap::new();
    for reservation in unit_of_work.reservations() {
        let total = totals.entry(reservation.product_id.clone()).or_default();
        *total = total.saturating_add(reservation.quantity);
    }

    for (product_id, requested) in &totals {
        let product = state.products.get(product_id).ok_or_else(|| {
            OrderError::InvalidProductInBasket {
                product_id: product_id.clone(),
            }
        })?;
        if product.stock < *requested {
            return Err(product.not_enough_stock(*requested).into());
        }
    }

    Ok(totals)
}

fn validate_orders(state: &ShopState, unit_of_work: &UnitOfWork) -> Result<()> {
    for order in unit_of_work.new_orders() {
        if state.orders.contains_key(&order.id()) {
            return Err(DomainError::AggregateAlreadyExists {
                aggregate_type: Order::aggregate_type(),
                aggregate_id: order.id().to_string(),
            });
        }
    }
    for order in unit_of_work.updated_orders() {
        if !state.orders.contains_key(&order.id()) {
            return Err(DomainError::AggregateNotFound {
                aggregate_type: Order::aggregate_type(),
                aggregate_id: order.id().to_string(),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl<O: OutboxStore> ProductRepository for InMemoryShopStore<O> {
    async fn get_by_id(&self, id: &ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(id).cloned())
    }
}

#[async_trait]
impl<O: OutboxStore> OrderRepository for InMemoryShopStore<O> {
    async fn get(&self, id: AggregateId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn commit(&self, unit_of_work: UnitOfWork) -> Result<()> {
        unit_of_work.ensure_captured()?;

        let mut state = self.state.write().await;
        validate_orders(&state, &unit_of_work)?;
        let reserved = validate_reservations(&state, &unit_of_work)?;

        let parts = unit_of_work.into_parts();
        let message_count = parts.outbox_messages.len();
        if message_count > 0 {
            self.outbox.append(parts.outbox_messages).await?;
        }

        for (product_id, quantity) in reserved {
            if let Some(product) = state.products.get_mut(&product_id) {
                product.stock -= quantity;
            }
        }
        for order in parts.new_orders.into_iter().chain(parts.updated_orders) {
            state.orders.insert(order.id(), order);
        }

        tracing::debug!(message_count, "unit of work committed");
        Ok(())
    }
}
