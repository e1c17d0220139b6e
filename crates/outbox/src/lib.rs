//! Transactional outbox: durable messages awaiting dispatch and the stores
//! that hold them.
//!
//! - [`OutboxMessage`] with its processed and retry bookkeeping
//! - [`OutboxStore`] implemented in memory and on PostgreSQL

pub mod error;
pub mod memory;
pub mod message;
pub mod postgres;
pub mod store;

pub use error::{OutboxError, Result};
pub use memory::InMemoryOutboxStore;
pub use message::{MAX_RETRY_COUNT, MessageId, OutboxMessage};
pub use postgres::PostgresOutboxStore;
pub use store::{DueQuery, OutboxStore, OutboxStoreExt};
