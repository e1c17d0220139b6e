//! Outbox relay: delivers captured domain events to in-process subscribers.
//!
//! This crate provides the delivery side of the transactional outbox:
//! - [`EventRegistry`] mapping stored message types back to events
//! - [`EventBus`] / [`EventHandler`] for in-process subscribers
//! - [`OutboxProcessor`] running one dispatch pass over due messages
//! - [`BackgroundRunner`] driving the processor until shutdown

pub mod bus;
pub mod config;
pub mod error;
pub mod processor;
pub mod registry;
pub mod runner;

pub use bus::{Delivery, EventBus, EventHandler};
pub use config::RelayConfig;
pub use error::{DispatchError, HandlerError, RelayError, Result};
pub use processor::{OutboxPass, OutboxProcessor, PassSummary};
pub use registry::{EventRegistry, order_event_registry};
pub use runner::{BackgroundRunner, shutdown_channel};
