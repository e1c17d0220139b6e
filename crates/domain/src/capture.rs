//! Capture hook: turns pending domain events into outbox messages.

use chrono::{DateTime, Utc};
use outbox::OutboxMessage;

use crate::aggregate::{AggregateRoot, DomainEvent};
use crate::error::{DomainError, Result};

/// Serializes every pending event of `aggregate` into a fresh outbox message
/// and clears the pending list.
///
/// All-or-nothing: if any event fails to serialize, no message is returned
/// and the pending list is left untouched.
pub fn capture_events<A: AggregateRoot>(
    aggregate: &mut A,
    now: DateTime<Utc>,
) -> Result<Vec<OutboxMessage>> {
    let messages = aggregate
        .pending_events()
        .iter()
        .map(|event| {
            let content =
                serde_json::to_string(event).map_err(|source| DomainError::EventSerialization {
                    aggregate_type: A::aggregate_type(),
                    event_type: event.event_type(),
                    source,
                })?;
            Ok(OutboxMessage::new(event.event_type(), content, now))
        })
        .collect::<Result<Vec<_>>>()?;

    aggregate.clear_events();

    if !messages.is_empty() {
        metrics::counter!("outbox_messages_captured_total").increment(messages.len() as u64);
        tracing::debug!(
            aggregate_type = A::aggregate_type(),
            aggregate_id = %aggregate.id(),
            count = messages.len(),
            "captured domain events"
        );
    }

    Ok(messages)
}
