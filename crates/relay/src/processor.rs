//! Outbox processor: one dispatch pass over due messages.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use common::{Clock, SystemClock};
use futures_util::FutureExt;
use outbox::{DueQuery, MAX_RETRY_COUNT, OutboxMessage, OutboxStore};

use crate::Result;
use crate::bus::{Delivery, EventBus};
use crate::error::DispatchError;
use crate::registry::EventRegistry;

/// Counts from one processor pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub selected: usize,
    pub processed: usize,
    pub failed: usize,
}

impl PassSummary {
    pub fn is_idle(&self) -> bool {
        self.selected == 0
    }
}

impl std::fmt::Display for PassSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "selected={} processed={} failed={}",
            self.selected, self.processed, self.failed
        )
    }
}

/// Something that runs one outbox pass.
///
/// Implemented by [`OutboxProcessor`]; the background runner only needs this.
#[async_trait]
pub trait OutboxPass: Send + Sync {
    async fn execute(&self) -> Result<PassSummary>;
}

/// Dispatches due outbox messages to the event bus.
///
/// A pass selects due messages oldest first, decodes each through the
/// registry, publishes it, and records the outcome on the message. A failure
/// on one message never stops the others. All outcomes are saved with one
/// `save_batch` call at the end of the pass.
pub struct OutboxProcessor<S, E, C = SystemClock> {
    store: S,
    registry: Arc<EventRegistry<E>>,
    bus: EventBus<E>,
    clock: C,
    max_retry_count: u32,
    batch_size: Option<usize>,
}

impl<S, E> OutboxProcessor<S, E, SystemClock>
where
    S: OutboxStore,
    E: Send + Sync + 'static,
{
    pub fn new(store: S, registry: Arc<EventRegistry<E>>, bus: EventBus<E>) -> Self {
        Self {
            store,
            registry,
            bus,
            clock: SystemClock,
            max_retry_count: MAX_RETRY_COUNT,
            batch_size: None,
        }
    }
}

impl<S, E, C> OutboxProcessor<S, E, C>
where
    S: OutboxStore,
    E: Send + Sync + 'static,
    C: Clock,
{
    pub fn with_clock<C2: Clock>(self, clock: C2) -> OutboxProcessor<S, E, C2> {
        OutboxProcessor {
            store: self.store,
            registry: self.registry,
            bus: self.bus,
            clock,
            max_retry_count: self.max_retry_count,
            batch_size: self.batch_size,
        }
    }

    pub fn with_max_retry_count(mut self, max_retry_count: u32) -> Self {
        self.max_retry_count = max_retry_count;
        self
    }

    /// Caps how many messages one pass selects. `None` selects all due messages.
    pub fn with_batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn query(&self) -> DueQuery {
        let query = DueQuery::new(self.max_retry_count);
        match self.batch_size {
            Some(limit) => query.limit(limit),
            None => query,
        }
    }

    async fn dispatch(&self, message: &OutboxMessage) -> std::result::Result<(), DispatchError> {
        let event = self
            .registry
            .decode(&message.message_type, &message.content)?;
        let delivery = Delivery::for_message(message);

        // A panic is recorded like any other handler failure.
        AssertUnwindSafe(self.bus.publish(&event, &delivery))
            .catch_unwind()
            .await
            .map_err(|payload| DispatchError::HandlerPanicked(panic_message(payload.as_ref())))??;
        Ok(())
    }

    /// Runs one pass.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self) -> Result<PassSummary> {
        let started = Instant::now();
        let messages = self.store.due_messages(self.query()).await?;
        if messages.is_empty() {
            return Ok(PassSummary::default());
        }

        let mut summary = PassSummary {
            selected: messages.len(),
            ..PassSummary::default()
        };
        let mut outcomes = Vec::with_capacity(messages.len());

        for mut message in messages {
            match self.dispatch(&message).await {
                Ok(()) => {
                    message.mark_processed(self.clock.now())?;
                    summary.processed += 1;
                    metrics::counter!("outbox_messages_dispatched_total", "message_type" => message.message_type.clone())
                        .increment(1);
                }
                Err(err) => {
                    tracing::warn!(
                        message_id = %message.id,
                        message_type = %message.message_type,
                        attempt = message.retry_count + 1,
                        error = %err,
                        "outbox message dispatch failed"
                    );
                    message.record_failure(err.to_string())?;
                    summary.failed += 1;
                    metrics::counter!("outbox_messages_failed_total", "message_type" => message.message_type.clone())
                        .increment(1);
                    if message.is_dead_letter(self.max_retry_count) {
                        tracing::error!(
                            message_id = %message.id,
                            message_type = %message.message_type,
                            "outbox message exhausted its retries"
                        );
                    }
                }
            }
            outcomes.push(message);
        }

        self.store.save_batch(outcomes).await?;

        metrics::histogram!("outbox_pass_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::debug!(%summary, "outbox pass complete");
        Ok(summary)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[async_trait]
impl<S, E, C> OutboxPass for OutboxProcessor<S, E, C>
where
    S: OutboxStore,
    E: Send + Sync + 'static,
    C: Clock,
{
    async fn execute(&self) -> Result<PassSummary> {
        OutboxProcessor::execute(self).await
    }
}
