//! End-to-end tests: OrderService commands -> outbox -> OutboxProcessor -> handlers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::{
    Address, AggregateRoot, Buyer, CartLine, CreateOrder, InMemoryShopStore, Money, OrderEvent,
    OrderService, Product, SetPaymentStatus,
};
use outbox::{InMemoryOutboxStore, OutboxMessage, OutboxStore};
use relay::{
    BackgroundRunner, Delivery, EventBus, EventHandler, HandlerError, OutboxProcessor,
    order_event_registry, shutdown_channel,
};
use tokio::sync::Mutex;

/// Records every event it sees.
#[derive(Default)]
struct Inbox {
    events: Mutex<Vec<OrderEvent>>,
}

#[async_trait]
impl EventHandler<OrderEvent> for Inbox {
    fn name(&self) -> &'static str {
        "inbox"
    }

    async fn handle(&self, event: &OrderEvent, _delivery: &Delivery) -> Result<(), HandlerError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

async fn setup() -> (OrderService<InMemoryShopStore>, InMemoryOutboxStore) {
    let outbox = InMemoryOutboxStore::new();
    let store = InMemoryShopStore::with_outbox(outbox.clone())
        .with_products([Product::new(
            "SKU-001",
            "Widget",
            Money::from_cents(1000),
            10,
            "/img/widget.png",
        )])
        .await;
    (OrderService::new(store), outbox)
}

fn buyer() -> Buyer {
    Buyer::new(
        "jane@example.com",
        "+1 555 0100",
        "Jane Doe",
        Address::new("1 Main St", "Springfield", "IL", "62701"),
    )
}

fn processor(
    outbox: InMemoryOutboxStore,
    inbox: Arc<Inbox>,
) -> OutboxProcessor<InMemoryOutboxStore, OrderEvent> {
    OutboxProcessor::new(
        outbox,
        Arc::new(order_event_registry()),
        EventBus::<OrderEvent>::new().with(inbox),
    )
}

#[tokio::test]
async fn placed_and_paid_order_events_reach_handlers() {
    let (service, outbox) = setup().await;
    let inbox = Arc::new(Inbox::default());

    let order = service
        .create_order(CreateOrder::new(buyer(), vec![CartLine::new("SKU-001", 2)]))
        .await
        .unwrap();
    service
        .set_payment_status(SetPaymentStatus::succeeded(order.id(), "pi_123"))
        .await
        .unwrap();

    let summary = processor(outbox.clone(), inbox.clone())
        .execute()
        .await
        .unwrap();

    assert_eq!(summary.selected, 2);
    assert_eq!(summary.processed, 2);

    let events = inbox.events.lock().await;
    match (&events[0], &events[1]) {
        (OrderEvent::OrderPlaced(placed), OrderEvent::PaymentConfirmed(confirmed)) => {
            assert_eq!(placed.order_id, order.id());
            assert_eq!(placed.total, Money::from_cents(2000));
            assert_eq!(confirmed.order_id, order.id());
            assert_eq!(confirmed.customer_email, "jane@example.com");
        }
        other => panic!("unexpected events {other:?}"),
    }

    assert!(outbox.all().await.unwrap().iter().all(OutboxMessage::is_processed));
}

#[tokio::test]
async fn rejected_order_leaves_nothing_to_relay() {
    let (service, outbox) = setup().await;

    let result = service
        .create_order(CreateOrder::new(buyer(), vec![CartLine::new("SKU-001", 11)]))
        .await;

    assert!(result.is_err());
    let summary = processor(outbox, Arc::new(Inbox::default()))
        .execute()
        .await
        .unwrap();
    assert!(summary.is_idle());
}

#[tokio::test]
async fn background_runner_drains_outbox_and_stops() {
    let (service, outbox) = setup().await;
    let inbox = Arc::new(Inbox::default());
    service
        .create_order(CreateOrder::new(buyer(), vec![CartLine::new("SKU-001", 1)]))
        .await
        .unwrap();

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let registry = Arc::new(order_event_registry());
    let bus = EventBus::<OrderEvent>::new().with(inbox.clone());
    let factory_outbox = outbox.clone();
    let handle = BackgroundRunner::new(
        move || OutboxProcessor::new(factory_outbox.clone(), registry.clone(), bus.clone()),
        Duration::from_millis(10),
        shutdown_rx,
    )
    .spawn();

    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if outbox.all().await.unwrap().iter().all(OutboxMessage::is_processed) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(drained.is_ok());

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
    assert_eq!(inbox.events.lock().await.len(), 1);
}

/// Panics on every event.
struct Exploding;

#[async_trait]
impl EventHandler<OrderEvent> for Exploding {
    fn name(&self) -> &'static str {
        "exploding"
    }

    async fn handle(&self, _event: &OrderEvent, _delivery: &Delivery) -> Result<(), HandlerError> {
        panic!("smtp client crashed");
    }
}

#[tokio::test]
async fn background_runner_survives_panicking_handler() {
    let (service, outbox) = setup().await;
    service
        .create_order(CreateOrder::new(buyer(), vec![CartLine::new("SKU-001", 1)]))
        .await
        .unwrap();

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let registry = Arc::new(order_event_registry());
    let bus = EventBus::<OrderEvent>::new().with(Arc::new(Exploding));
    let factory_outbox = outbox.clone();
    let handle = BackgroundRunner::new(
        move || OutboxProcessor::new(factory_outbox.clone(), registry.clone(), bus.clone()),
        Duration::from_millis(10),
        shutdown_rx,
    )
    .spawn();

    // Two recorded failures mean the loop went on after the first panic.
    let retried = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let messages = outbox.all().await.unwrap();
            if messages[0].retry_count >= 2 {
                break messages[0].clone();
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("runner stopped retrying");

    assert!(retried.processed_on.is_none());
    assert_eq!(
        retried.error.as_deref(),
        Some("Handler panicked: smtp client crashed")
    );
    assert!(!handle.is_finished());

    shutdown_tx.send(true).unwrap();
    assert!(handle.await.is_ok());
}
