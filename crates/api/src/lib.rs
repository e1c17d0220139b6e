//! HTTP API server and outbox relay host for order processing.
//!
//! Provides REST endpoints for placing and progressing orders, hosts the
//! background outbox relay, and exposes structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod notifications;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{InMemoryShopStore, Money, OrderEvent, OrderService, Product};
use metrics_exporter_prometheus::PrometheusHandle;
use outbox::OutboxStore;
use relay::{BackgroundRunner, EventBus, OutboxProcessor, RelayConfig, order_event_registry};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use notifications::OrderNotifier;

/// Shared application state accessible from all handlers.
pub struct AppState<O> {
    pub order_service: OrderService<InMemoryShopStore<O>>,
    pub outbox: O,
    pub max_retry_count: u32,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<O: OutboxStore + Clone + 'static>(
    state: Arc<AppState<O>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<O>))
        .route("/orders", post(routes::orders::create::<O>))
        .route("/orders/{id}", get(routes::orders::get::<O>))
        .route("/orders/{id}/payment", post(routes::orders::payment::<O>))
        .route("/orders/{id}/status", post(routes::orders::status::<O>))
        .route("/outbox", get(routes::outbox::list::<O>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Products available when the service starts.
pub fn demo_catalog() -> Vec<Product> {
    vec![
        Product::new(
            "SKU-001",
            "Widget",
            Money::from_cents(1000),
            100,
            "/images/widget.png",
        ),
        Product::new(
            "SKU-002",
            "Gadget",
            Money::from_cents(2500),
            50,
            "/images/gadget.png",
        ),
        Product::new(
            "SKU-003",
            "Gizmo",
            Money::from_cents(499),
            5,
            "/images/gizmo.png",
        ),
    ]
}

/// Creates the application state with the demo catalog, committing outbox
/// messages into `outbox`.
pub async fn create_default_state<O: OutboxStore + Clone + 'static>(
    outbox: O,
    relay_config: &RelayConfig,
) -> Arc<AppState<O>> {
    let store = InMemoryShopStore::with_outbox(outbox.clone())
        .with_products(demo_catalog())
        .await;

    Arc::new(AppState {
        order_service: OrderService::new(store),
        outbox,
        max_retry_count: relay_config.max_retry_count,
    })
}

/// Builds the event bus with every in-process subscriber.
pub fn create_event_bus() -> EventBus<OrderEvent> {
    EventBus::<OrderEvent>::new().with(Arc::new(OrderNotifier::new()))
}

/// Spawns the background runner relaying `outbox` to the event bus.
pub fn spawn_relay<O: OutboxStore + Clone + 'static>(
    outbox: O,
    bus: EventBus<OrderEvent>,
    relay_config: &RelayConfig,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let registry = Arc::new(order_event_registry());
    let max_retry_count = relay_config.max_retry_count;
    let batch_size = relay_config.batch_size;
    tracing::info!(
        handlers = bus.handler_count(),
        max_retry_count,
        "starting outbox relay"
    );

    BackgroundRunner::new(
        move || {
            OutboxProcessor::new(outbox.clone(), registry.clone(), bus.clone())
                .with_max_retry_count(max_retry_count)
                .with_batch_size(batch_size)
        },
        relay_config.poll_interval,
        shutdown,
    )
    .spawn()
}
