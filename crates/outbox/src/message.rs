use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{OutboxError, Result};

/// Number of failed dispatch attempts after which a message is no longer selected.
pub const MAX_RETRY_COUNT: u32 = 5;

/// Unique identifier for an outbox message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MessageId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A serialized domain event waiting to be dispatched.
///
/// Messages are written in the same transaction as the aggregate change that
/// raised the event and are later picked up by the outbox processor. Once
/// `processed_on` is set the message is frozen; messages are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxMessage {
    /// Unique identifier, also usable by consumers as a deduplication key.
    pub id: MessageId,

    /// Discriminator naming the event shape (e.g. "PaymentConfirmed").
    pub message_type: String,

    /// The serialized event payload.
    pub content: String,

    /// When the originating event was captured.
    pub occurred_on: DateTime<Utc>,

    /// When the message was successfully dispatched.
    pub processed_on: Option<DateTime<Utc>>,

    /// Number of failed dispatch attempts.
    pub retry_count: u32,

    /// Description of the most recent failure.
    pub error: Option<String>,
}

impl OutboxMessage {
    /// Creates a fresh, undispatched message.
    pub fn new(
        message_type: impl Into<String>,
        content: impl Into<String>,
        occurred_on: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            message_type: message_type.into(),
            content: content.into(),
            occurred_on,
            processed_on: None,
            retry_count: 0,
            error: None,
        }
    }

    /// Returns true once the message has been dispatched.
    pub fn is_processed(&self) -> bool {
        self.processed_on.is_some()
    }

    /// Returns true if the processor should pick this message up.
    pub fn is_due(&self, max_retry_count: u32) -> bool {
        self.processed_on.is_none() && self.retry_count < max_retry_count
    }

    /// Returns true if the message exhausted its retries without being dispatched.
    pub fn is_dead_letter(&self, max_retry_count: u32) -> bool {
        self.processed_on.is_none() && self.retry_count >= max_retry_count
    }

    /// Records a successful dispatch.
    pub fn mark_processed(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.is_processed() {
            return Err(OutboxError::AlreadyProcessed(self.id));
        }
        self.processed_on = Some(now);
        Ok(())
    }

    /// Records a failed dispatch attempt.
    pub fn record_failure(&mut self, error: impl Into<String>) -> Result<()> {
        if self.is_processed() {
            return Err(OutboxError::AlreadyProcessed(self.id));
        }
        self.retry_count += 1;
        self.error = Some(error.into());
        Ok(())
    }
}
