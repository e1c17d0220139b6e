//! Order notification subscriber.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use domain::OrderEvent;
use outbox::MessageId;
use relay::{Delivery, EventHandler, HandlerError};
use tokio::sync::Mutex;

/// Default number of message ids remembered for deduplication.
///
/// Redeliveries happen within a few relay passes of the first attempt, so a
/// window far larger than one pass is enough.
pub const DEFAULT_DEDUP_WINDOW: usize = 10_000;

/// Message ids of the most recent notifications, oldest evicted first.
#[derive(Default)]
struct RecentDeliveries {
    order: VecDeque<MessageId>,
    ids: HashSet<MessageId>,
    sent: usize,
}

impl RecentDeliveries {
    fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    fn remember(&mut self, id: MessageId, capacity: usize) {
        if !self.ids.insert(id) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }
}

/// Sends customer notifications for order events.
///
/// Email templating and delivery live outside this service; the notifier
/// logs the notification it would send. Redelivered messages are skipped by
/// message id within a bounded window of recent deliveries.
pub struct OrderNotifier {
    recent: Mutex<RecentDeliveries>,
    capacity: usize,
}

impl OrderNotifier {
    pub fn new() -> Self {
        Self::with_dedup_window(DEFAULT_DEDUP_WINDOW)
    }

    /// Remembers at most `capacity` message ids (at least one).
    pub fn with_dedup_window(capacity: usize) -> Self {
        Self {
            recent: Mutex::new(RecentDeliveries::default()),
            capacity: capacity.max(1),
        }
    }

    /// Returns how many notifications were sent.
    pub async fn sent_count(&self) -> usize {
        self.recent.lock().await.sent
    }

    /// Returns how many message ids are currently remembered.
    pub async fn remembered(&self) -> usize {
        self.recent.lock().await.ids.len()
    }
}

impl Default for OrderNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler<OrderEvent> for OrderNotifier {
    fn name(&self) -> &'static str {
        "order_notifier"
    }

    async fn handle(&self, event: &OrderEvent, delivery: &Delivery) -> Result<(), HandlerError> {
        let order_id = event.order_id();
        let mut recent = self.recent.lock().await;
        if recent.contains(&delivery.message_id) {
            tracing::debug!(message_id = %delivery.message_id, %order_id, "notification already sent");
            return Ok(());
        }

        match event {
            OrderEvent::OrderPlaced(placed) => {
                tracing::info!(
                    to = %placed.customer_email,
                    %order_id,
                    total = %placed.total,
                    attempt = delivery.attempt,
                    "sending order received notification"
                );
            }
            OrderEvent::PaymentConfirmed(confirmed) => {
                tracing::info!(
                    to = %confirmed.customer_email,
                    %order_id,
                    attempt = delivery.attempt,
                    "sending payment confirmation notification"
                );
            }
        }

        metrics::counter!("order_notifications_sent_total", "event_type" => domain::DomainEvent::event_type(event))
            .increment(1);
        recent.sent += 1;
        recent.remember(delivery.message_id, self.capacity);
        Ok(())
    }
}
