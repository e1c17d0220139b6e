use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::AggregateId;
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use domain::{DomainEvent, OrderEvent, PaymentConfirmed};
use outbox::{InMemoryOutboxStore, OutboxMessage, OutboxStore};
use relay::{Delivery, EventBus, EventHandler, HandlerError, OutboxProcessor, order_event_registry};

struct Noop;

#[async_trait]
impl EventHandler<OrderEvent> for Noop {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn handle(&self, _event: &OrderEvent, _delivery: &Delivery) -> Result<(), HandlerError> {
        Ok(())
    }
}

fn messages(n: usize) -> Vec<OutboxMessage> {
    (0..n)
        .map(|_| {
            let event = OrderEvent::from(PaymentConfirmed {
                order_id: AggregateId::new(),
                customer_email: "bench@example.com".to_string(),
            });
            OutboxMessage::new(
                event.event_type(),
                serde_json::to_string(&event).unwrap(),
                Utc::now(),
            )
        })
        .collect()
}

fn bench_pass(c: &mut Criterion, n: usize) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let registry = Arc::new(order_event_registry());
    let bus = EventBus::<OrderEvent>::new().with(Arc::new(Noop));

    c.bench_function(&format!("relay/pass_{n}_messages"), |b| {
        b.iter_batched(
            || {
                let store = InMemoryOutboxStore::new();
                rt.block_on(store.append(messages(n))).unwrap();
                OutboxProcessor::new(store, registry.clone(), bus.clone())
            },
            |processor| {
                rt.block_on(processor.execute()).unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_pass_10(c: &mut Criterion) {
    bench_pass(c, 10);
}

fn bench_pass_100(c: &mut Criterion) {
    bench_pass(c, 100);
}

criterion_group!(benches, bench_pass_10, bench_pass_100);
criterion_main!(benches);
