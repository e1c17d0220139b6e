//! Order placement, payment and fulfilment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{
    Address, AdvanceOrderStatus, AggregateRoot, Buyer, CartLine, CreateOrder, CustomerId, Order,
    OrderStatus, SetPaymentStatus,
};
use outbox::OutboxStore;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub email: String,
    pub phone_number: String,
    pub full_name: String,
    pub address: AddressDto,
    pub customer_id: Option<String>,
    pub items: Vec<CartLineRequest>,
}

#[derive(Deserialize)]
pub struct CartLineRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Deserialize, Serialize)]
pub struct AddressDto {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

#[derive(Deserialize)]
pub struct PaymentRequest {
    pub success: bool,
    pub payment_intent_id: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
    pub notes: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub email: String,
    pub phone_number: String,
    pub full_name: String,
    pub address: AddressDto,
    pub customer_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub history: Vec<HistoryEntryResponse>,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub image_url: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct HistoryEntryResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        let address = order.address();
        Self {
            id: order.id().to_string(),
            email: order.email().to_string(),
            phone_number: order.phone_number().to_string(),
            full_name: order.full_name().to_string(),
            address: AddressDto {
                line1: address.line1.clone(),
                line2: address.line2.clone(),
                city: address.city.clone(),
                state: address.state.clone(),
                postal_code: address.postal_code.clone(),
            },
            customer_id: order.customer_id().map(|id| id.to_string()),
            payment_intent_id: order.payment_intent_id().map(str::to_string),
            status: order.status().to_string(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    product_name: item.product_name.clone(),
                    image_url: item.image_url.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                })
                .collect(),
            history: order
                .history()
                .iter()
                .map(|entry| HistoryEntryResponse {
                    status: entry.status.to_string(),
                    timestamp: entry.timestamp,
                    notes: entry.notes.clone(),
                })
                .collect(),
            total_cents: order.total().cents(),
        }
    }
}

// -- Handlers --

/// POST /orders: place an order from a cart.
#[tracing::instrument(skip(state, req), fields(lines = req.items.len()))]
pub async fn create<O: OutboxStore + Clone + 'static>(
    State(state): State<Arc<AppState<O>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let address = Address {
        line1: req.address.line1,
        line2: req.address.line2,
        city: req.address.city,
        state: req.address.state,
        postal_code: req.address.postal_code,
    };
    let mut buyer = Buyer::new(req.email, req.phone_number, req.full_name, address);
    if let Some(ref id_str) = req.customer_id {
        let uuid = uuid::Uuid::parse_str(id_str)
            .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))?;
        buyer = buyer.with_customer(CustomerId::from_uuid(uuid));
    }

    let lines = req
        .items
        .into_iter()
        .map(|line| CartLine::new(line.product_id, line.quantity))
        .collect();

    let order = state
        .order_service
        .create_order(CreateOrder::new(buyer, lines))
        .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/{id}: load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get<O: OutboxStore + Clone + 'static>(
    State(state): State<Arc<AppState<O>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_aggregate_id(&id)?;
    let order = state
        .order_service
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/payment: record the result of a payment attempt.
#[tracing::instrument(skip(state, req), fields(success = req.success))]
pub async fn payment<O: OutboxStore + Clone + 'static>(
    State(state): State<Arc<AppState<O>>>,
    Path(id): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_aggregate_id(&id)?;
    let order = state
        .order_service
        .set_payment_status(SetPaymentStatus::new(
            order_id,
            req.success,
            req.payment_intent_id,
        ))
        .await?;

    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/status: move an order along its fulfilment path.
#[tracing::instrument(skip(state, req), fields(status = %req.status))]
pub async fn status<O: OutboxStore + Clone + 'static>(
    State(state): State<Arc<AppState<O>>>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_aggregate_id(&id)?;
    let next: OrderStatus = req
        .status
        .parse()
        .map_err(|e: domain::UnknownOrderStatus| ApiError::BadRequest(e.to_string()))?;

    let mut cmd = AdvanceOrderStatus::new(order_id, next);
    if let Some(notes) = req.notes {
        cmd = cmd.with_notes(notes);
    }
    let order = state.order_service.advance_status(cmd).await?;

    Ok(Json(OrderResponse::from(&order)))
}

fn parse_aggregate_id(id: &str) -> Result<AggregateId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
