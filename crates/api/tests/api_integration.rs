//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use outbox::{DueQuery, InMemoryOutboxStore, OutboxStore};
use relay::RelayConfig;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn relay_config() -> RelayConfig {
    RelayConfig {
        poll_interval: Duration::from_millis(10),
        ..RelayConfig::default()
    }
}

async fn setup() -> (axum::Router, InMemoryOutboxStore) {
    let outbox = InMemoryOutboxStore::new();
    let state = api::create_default_state(outbox.clone(), &relay_config()).await;
    let app = api::create_app(state, get_metrics_handle());
    (app, outbox)
}

fn order_body(product_id: &str, quantity: u32) -> serde_json::Value {
    serde_json::json!({
        "email": "jane@example.com",
        "phone_number": "+1-555-0100",
        "full_name": "Jane Doe",
        "address": {
            "line1": "1 Main St",
            "city": "Springfield",
            "state": "IL",
            "postal_code": "62701"
        },
        "items": [{ "product_id": product_id, "quantity": quantity }]
    })
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn create_order(app: &axum::Router) -> String {
    let (status, json) = send(app, post_json("/orders", &order_body("SKU-001", 2))).await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup().await;

    let (status, json) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["outbox_backlog"], 0);
}

#[tokio::test]
async fn test_create_order() {
    let (app, outbox) = setup().await;

    let (status, json) = send(&app, post_json("/orders", &order_body("SKU-001", 2))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "PaymentPending");
    assert_eq!(json["total_cents"], 2000);
    assert_eq!(json["items"][0]["product_name"], "Widget");
    assert_eq!(json["history"].as_array().unwrap().len(), 1);
    assert_eq!(outbox.message_count().await, 1);
}

#[tokio::test]
async fn test_create_and_get_order() {
    let (app, _) = setup().await;
    let order_id = create_order(&app).await;

    let (status, json) = send(&app, get(&format!("/orders/{order_id}"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], order_id.as_str());
    assert_eq!(json["email"], "jane@example.com");
    assert_eq!(json["address"]["city"], "Springfield");
}

#[tokio::test]
async fn test_get_unknown_order_returns_404() {
    let (app, _) = setup().await;

    let (status, _) = send(&app, get(&format!("/orders/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_malformed_order_id_returns_400() {
    let (app, _) = setup().await;

    let (status, json) = send(&app, get("/orders/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_order_exceeding_stock_is_rejected() {
    let (app, outbox) = setup().await;

    // The demo catalog holds 5 units of SKU-003.
    let (status, json) = send(&app, post_json("/orders", &order_body("SKU-003", 6))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Gizmo"));
    assert_eq!(outbox.message_count().await, 0);
}

#[tokio::test]
async fn test_order_with_unknown_product_is_rejected() {
    let (app, _) = setup().await;

    let (status, _) = send(&app, post_json("/orders", &order_body("SKU-404", 1))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_without_items_is_rejected() {
    let (app, _) = setup().await;
    let mut body = order_body("SKU-001", 1);
    body["items"] = serde_json::json!([]);

    let (status, _) = send(&app, post_json("/orders", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_payment_flow() {
    let (app, outbox) = setup().await;
    let order_id = create_order(&app).await;
    let uri = format!("/orders/{order_id}/payment");

    let (status, json) = send(
        &app,
        post_json(
            &uri,
            &serde_json::json!({ "success": true, "payment_intent_id": "pi_123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "PaymentSucceeded");
    assert_eq!(json["payment_intent_id"], "pi_123");
    assert_eq!(outbox.message_count().await, 2);

    // A settled payment cannot be recorded twice.
    let (status, _) = send(
        &app,
        post_json(
            &uri,
            &serde_json::json!({ "success": true, "payment_intent_id": "pi_456" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(outbox.message_count().await, 2);
}

#[tokio::test]
async fn test_failed_payment_raises_no_event() {
    let (app, outbox) = setup().await;
    let order_id = create_order(&app).await;

    let (status, json) = send(
        &app,
        post_json(
            &format!("/orders/{order_id}/payment"),
            &serde_json::json!({ "success": false }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "PaymentFailed");
    assert_eq!(outbox.message_count().await, 1);
}

#[tokio::test]
async fn test_successful_payment_requires_intent_id() {
    let (app, _) = setup().await;
    let order_id = create_order(&app).await;

    let (status, _) = send(
        &app,
        post_json(
            &format!("/orders/{order_id}/payment"),
            &serde_json::json!({ "success": true, "payment_intent_id": "  " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_transitions() {
    let (app, _) = setup().await;
    let order_id = create_order(&app).await;
    let status_uri = format!("/orders/{order_id}/status");

    // Fulfilment cannot start before payment.
    let (status, _) = send(
        &app,
        post_json(&status_uri, &serde_json::json!({ "status": "Processing" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(
        &app,
        post_json(
            &format!("/orders/{order_id}/payment"),
            &serde_json::json!({ "success": true, "payment_intent_id": "pi_1" }),
        ),
    )
    .await;

    let (status, json) = send(
        &app,
        post_json(
            &status_uri,
            &serde_json::json!({ "status": "Processing", "notes": "picked" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Processing");
    assert_eq!(json["history"][2]["notes"], "picked");

    let (status, _) = send(
        &app,
        post_json(&status_uri, &serde_json::json!({ "status": "Lost" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_outbox_listing() {
    let (app, _) = setup().await;
    let order_id = create_order(&app).await;

    let (status, json) = send(&app, get("/outbox")).await;

    assert_eq!(status, StatusCode::OK);
    let messages = json.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["message_type"], "OrderPlaced");
    assert_eq!(messages[0]["content"]["order_id"], order_id.as_str());
    assert_eq!(messages[0]["retry_count"], 0);
    assert_eq!(messages[0]["dead_letter"], false);

    let (_, dead) = send(&app, get("/outbox?dead=true")).await;
    assert!(dead.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup().await;

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_relay_delivers_captured_messages() {
    let outbox = InMemoryOutboxStore::new();
    let config = relay_config();
    let state = api::create_default_state(outbox.clone(), &config).await;
    let app = api::create_app(Arc::clone(&state), get_metrics_handle());

    let (shutdown_tx, shutdown_rx) = relay::shutdown_channel();
    let relay = api::spawn_relay(outbox.clone(), api::create_event_bus(), &config, shutdown_rx);

    create_order(&app).await;

    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let due = outbox
                .due_messages(DueQuery::new(config.max_retry_count))
                .await
                .unwrap();
            if due.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(drained.is_ok(), "relay did not drain the outbox");

    let messages = outbox.all().await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].is_processed());

    shutdown_tx.send(true).unwrap();
    relay.await.unwrap();
}
