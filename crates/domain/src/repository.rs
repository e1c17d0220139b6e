//! Repository traits consumed by the order service.

use async_trait::async_trait;
use common::AggregateId;

use crate::catalog::Product;
use crate::error::Result;
use crate::order::{Order, ProductId};
use crate::unit_of_work::UnitOfWork;

/// Read access to the product catalog.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Looks up a product by id. Returns `None` if it doesn't exist.
    async fn get_by_id(&self, id: &ProductId) -> Result<Option<Product>>;
}

/// Order storage with atomic commits.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Loads an order. Returns `None` if it doesn't exist.
    async fn get(&self, id: AggregateId) -> Result<Option<Order>>;

    /// Commits a unit of work.
    ///
    /// Staged orders, stock reservations and outbox messages are written
    /// together; on error nothing is written. Stock reservations are checked
    /// against the stored stock at commit time.
    async fn commit(&self, unit_of_work: UnitOfWork) -> Result<()>;
}
