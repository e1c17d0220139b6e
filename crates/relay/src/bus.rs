//! In-process event bus.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outbox::{MessageId, OutboxMessage};

use crate::error::HandlerError;

/// Where a dispatched event came from.
///
/// Delivery is at-least-once: the same message may reach a handler again
/// after a crash or a failure in another handler. `message_id` is stable
/// across attempts and can be used to deduplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: MessageId,
    pub occurred_on: DateTime<Utc>,

    /// 1 on the first attempt.
    pub attempt: u32,
}

impl Delivery {
    pub fn for_message(message: &OutboxMessage) -> Self {
        Self {
            message_id: message.id,
            occurred_on: message.occurred_on,
            attempt: message.retry_count.saturating_add(1),
        }
    }
}

/// A subscriber to relayed events.
#[async_trait]
pub trait EventHandler<E>: Send + Sync {
    /// Returns the name of this handler.
    fn name(&self) -> &'static str;

    /// Handles one event.
    ///
    /// Handlers should ignore events they are not interested in.
    async fn handle(&self, event: &E, delivery: &Delivery) -> Result<(), HandlerError>;
}

/// Publishes events to every subscribed handler, in subscription order.
pub struct EventBus<E> {
    handlers: Vec<Arc<dyn EventHandler<E>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<E: Send + Sync> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler.
    pub fn subscribe(&mut self, handler: Arc<dyn EventHandler<E>>) {
        self.handlers.push(handler);
    }

    /// Builder form of [`EventBus::subscribe`].
    pub fn with(mut self, handler: Arc<dyn EventHandler<E>>) -> Self {
        self.subscribe(handler);
        self
    }

    /// Returns the number of subscribed handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Delivers `event` to every handler.
    ///
    /// Stops at the first handler error and returns it; handlers after the
    /// failing one do not see the event on this attempt.
    pub async fn publish(&self, event: &E, delivery: &Delivery) -> Result<(), HandlerError> {
        for handler in &self.handlers {
            handler.handle(event, delivery).await.inspect_err(|err| {
                tracing::debug!(handler = handler.name(), error = %err, "handler failed");
            })?;
        }
        Ok(())
    }
}
