//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Domain logic error.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Outbox store error.
    #[error(transparent)]
    Outbox(#[from] outbox::OutboxError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(err) => domain_error_status(err),
            ApiError::Outbox(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Order(order_err) => match order_err {
            OrderError::PaymentAlreadyProcessed { .. }
            | OrderError::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
            OrderError::NoItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidProductInBasket { .. }
            | OrderError::NotEnoughStock { .. }
            | OrderError::InvalidPaymentIntentId => StatusCode::BAD_REQUEST,
        },
        DomainError::AggregateNotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::AggregateAlreadyExists { .. } => StatusCode::CONFLICT,
        DomainError::Outbox(_)
        | DomainError::EventSerialization { .. }
        | DomainError::UncapturedEvents { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
