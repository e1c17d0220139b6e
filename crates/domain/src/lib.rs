//! Order domain for the transactional outbox.
//!
//! This crate provides:
//! - `AggregateRoot` / `DomainEvent` traits for aggregates that raise events
//! - the capture hook turning pending events into outbox messages
//! - the Order aggregate with its payment and fulfilment status machine
//! - stock reservation against the product catalog
//! - `UnitOfWork` and the repositories that commit it atomically

pub mod aggregate;
pub mod capture;
pub mod catalog;
pub mod command;
pub mod error;
pub mod memory;
pub mod order;
pub mod repository;
pub mod unit_of_work;

pub use aggregate::{AggregateRoot, DomainEvent, EventShape};
pub use capture::capture_events;
pub use catalog::Product;
pub use command::Command;
pub use error::{DomainError, Result};
pub use memory::InMemoryShopStore;
pub use order::{
    Address, AdvanceOrderStatus, Buyer, CartLine, CreateOrder, CustomerId, Money, Order,
    OrderError, OrderEvent, OrderHistoryEntry, OrderItem, OrderPlaced, OrderService, OrderStatus,
    PaymentConfirmed, ProductId, SetPaymentStatus, UnknownOrderStatus,
};
pub use repository::{OrderRepository, ProductRepository};
pub use unit_of_work::{StockReservation, UnitOfWork, UnitOfWorkParts};
