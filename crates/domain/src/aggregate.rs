//! Core aggregate and domain event traits.

use common::AggregateId;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + Send + Sync + Clone + 'static {
    /// Returns the event type name.
    ///
    /// Stored as the outbox message type and used to pick the decoder
    /// when the message is relayed.
    fn event_type(&self) -> &'static str;
}

/// A single concrete event payload with a stable type name.
///
/// Application event enums wrap one or more shapes; the relay decodes a
/// stored message back into its shape by looking up `EVENT_TYPE`.
pub trait EventShape: Serialize + DeserializeOwned + Send + Sync + 'static {
    const EVENT_TYPE: &'static str;
}

/// Trait for aggregate roots that raise domain events.
///
/// An aggregate is a cluster of domain objects that can be treated as a single unit.
/// State transitions push events onto a pending list; nothing leaves the
/// aggregate until the capture hook drains that list at commit time.
pub trait AggregateRoot: Send + Sync {
    /// The type of events this aggregate raises.
    type Event: DomainEvent;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    fn id(&self) -> AggregateId;

    /// Returns the events raised since the last capture.
    fn pending_events(&self) -> &[Self::Event];

    /// Drops all pending events.
    fn clear_events(&mut self);

    fn has_pending_events(&self) -> bool {
        !self.pending_events().is_empty()
    }
}
