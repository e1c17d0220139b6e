//! Event registry: maps stored message types back to events.

use std::collections::HashMap;

use domain::{EventShape, OrderEvent, OrderPlaced, PaymentConfirmed};

use crate::error::DispatchError;

type Decoder<E> = fn(&str) -> serde_json::Result<E>;

fn decode_as<S, E>(content: &str) -> serde_json::Result<E>
where
    S: EventShape + Into<E>,
{
    serde_json::from_str::<S>(content).map(Into::into)
}

/// Maps each message type to a decoder for one event shape.
///
/// Every decoder produces the application's event type `E`, so handlers
/// only deal with one enum.
pub struct EventRegistry<E> {
    decoders: HashMap<&'static str, Decoder<E>>,
}

impl<E> EventRegistry<E> {
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registers the shape `S` under its `EVENT_TYPE`.
    ///
    /// Registering the same type twice keeps the latest decoder.
    pub fn register<S>(&mut self) -> &mut Self
    where
        S: EventShape + Into<E>,
    {
        self.decoders.insert(S::EVENT_TYPE, decode_as::<S, E>);
        self
    }

    /// Builder form of [`EventRegistry::register`].
    pub fn with<S>(mut self) -> Self
    where
        S: EventShape + Into<E>,
    {
        self.register::<S>();
        self
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Returns the registered message types, sorted.
    pub fn event_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.decoders.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Decodes stored content into an event.
    pub fn decode(&self, event_type: &str, content: &str) -> Result<E, DispatchError> {
        let decoder = self
            .decoders
            .get(event_type)
            .ok_or_else(|| DispatchError::UnknownEventType(event_type.to_string()))?;

        decoder(content).map_err(|source| DispatchError::Deserialization {
            event_type: event_type.to_string(),
            source,
        })
    }
}

impl<E> Default for EventRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry for every event the Order aggregate raises.
pub fn order_event_registry() -> EventRegistry<OrderEvent> {
    EventRegistry::new()
        .with::<OrderPlaced>()
        .with::<PaymentConfirmed>()
}
