//! Domain error types.

use outbox::OutboxError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An order rule was violated.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An error occurred in the outbox store.
    #[error("Outbox error: {0}")]
    Outbox(#[from] OutboxError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// An aggregate with this id was already stored.
    #[error("Aggregate already exists: {aggregate_type} with id {aggregate_id}")]
    AggregateAlreadyExists {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// A pending event could not be serialized into an outbox message.
    #[error("Failed to serialize {event_type} raised by {aggregate_type}: {source}")]
    EventSerialization {
        aggregate_type: &'static str,
        event_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// An aggregate reached commit with events that were never captured.
    #[error("{aggregate_type} {aggregate_id} has {count} uncaptured events")]
    UncapturedEvents {
        aggregate_type: &'static str,
        aggregate_id: String,
        count: usize,
    },
}

pub type Result<T> = std::result::Result<T, DomainError>;
