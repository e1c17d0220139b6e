//! Relay error types.

use outbox::OutboxError;
use thiserror::Error;

/// Errors that stop a processor pass.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The outbox store failed to load or save messages.
    #[error("Outbox error: {0}")]
    Outbox(#[from] OutboxError),
}

/// Why a single message could not be dispatched.
///
/// Recorded on the message as its error text; never stops a pass.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No decoder is registered for the message type.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// The content does not match the registered shape.
    #[error("Failed to deserialize {event_type}: {source}")]
    Deserialization {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    /// A subscriber rejected the event.
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// A subscriber panicked while handling the event.
    #[error("Handler panicked: {0}")]
    HandlerPanicked(String),
}

/// Error returned by an event handler.
#[derive(Debug, Error)]
#[error("Handler {handler} failed: {message}")]
pub struct HandlerError {
    pub handler: &'static str,
    pub message: String,
}

impl HandlerError {
    pub fn new(handler: &'static str, message: impl Into<String>) -> Self {
        Self {
            handler,
            message: message.into(),
        }
    }
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
