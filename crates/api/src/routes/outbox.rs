//! Outbox inspection endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use outbox::{OutboxMessage, OutboxStore};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct OutboxQuery {
    /// When true, only messages that exhausted their retries are listed.
    #[serde(default)]
    pub dead: bool,
}

#[derive(Serialize)]
pub struct OutboxMessageResponse {
    pub id: String,
    pub message_type: String,
    pub content: serde_json::Value,
    pub occurred_on: DateTime<Utc>,
    pub processed_on: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub error: Option<String>,
    pub dead_letter: bool,
}

impl OutboxMessageResponse {
    fn new(message: OutboxMessage, max_retry_count: u32) -> Self {
        let dead_letter = message.is_dead_letter(max_retry_count);
        // Content is stored as text; show it as JSON when it parses.
        let content = serde_json::from_str(&message.content)
            .unwrap_or(serde_json::Value::String(message.content));
        Self {
            id: message.id.to_string(),
            message_type: message.message_type,
            content,
            occurred_on: message.occurred_on,
            processed_on: message.processed_on,
            retry_count: message.retry_count,
            error: message.error,
            dead_letter,
        }
    }
}

/// GET /outbox: list outbox messages, oldest first.
#[tracing::instrument(skip(state))]
pub async fn list<O: OutboxStore + Clone + 'static>(
    State(state): State<Arc<AppState<O>>>,
    Query(query): Query<OutboxQuery>,
) -> Result<Json<Vec<OutboxMessageResponse>>, ApiError> {
    let messages = state.outbox.all().await?;

    let response = messages
        .into_iter()
        .map(|m| OutboxMessageResponse::new(m, state.max_retry_count))
        .filter(|m| !query.dead || m.dead_letter)
        .collect();

    Ok(Json(response))
}
