use thiserror::Error;

use crate::MessageId;

/// Errors that can occur when interacting with an outbox store.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// The message does not exist in the store.
    #[error("Outbox message not found: {0}")]
    MessageNotFound(MessageId),

    /// The message was already dispatched and can no longer change.
    #[error("Outbox message {0} was already processed")]
    AlreadyProcessed(MessageId),

    /// A message with the same id is already stored.
    #[error("Duplicate outbox message: {0}")]
    DuplicateMessage(MessageId),

    /// The message is not in a state that can be appended.
    #[error("Invalid outbox message: {0}")]
    InvalidMessage(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for outbox operations.
pub type Result<T> = std::result::Result<T, OutboxError>;
