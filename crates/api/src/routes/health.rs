//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use outbox::{DueQuery, OutboxStore};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,

    /// Messages still waiting to be relayed.
    pub outbox_backlog: usize,
}

/// GET /health: returns system health and the outbox backlog.
pub async fn check<O: OutboxStore + Clone + 'static>(
    State(state): State<Arc<AppState<O>>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let backlog = state
        .outbox
        .due_messages(DueQuery::new(state.max_retry_count))
        .await?
        .len();

    Ok(Json(HealthResponse {
        status: "ok",
        outbox_backlog: backlog,
    }))
}
