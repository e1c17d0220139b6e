//! Order status machine and history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// PaymentPending ──┬──► PaymentSucceeded ──► Processing ──► Shipping ──► Shipped ──► ReceivedByCustomer
///                  │           ▲
///                  └──► PaymentFailed ◄─┐
///                              └────────┘ (retry)
///
/// PaymentSucceeded..ReceivedByCustomer ──► RefundRequested ──► Refunded
/// ```
///
/// `PaymentFailed` is not terminal: another payment attempt may follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order placed, awaiting the payment result.
    #[default]
    PaymentPending,

    PaymentSucceeded,

    /// The last payment attempt failed; a new attempt is allowed.
    PaymentFailed,

    Processing,
    Shipping,
    Shipped,
    ReceivedByCustomer,
    RefundRequested,

    /// Terminal.
    Refunded,
}

impl OrderStatus {
    /// Returns true if a payment result may be recorded in this status.
    pub fn accepts_payment_result(&self) -> bool {
        matches!(self, OrderStatus::PaymentPending | OrderStatus::PaymentFailed)
    }

    /// Returns true if a refund may be requested in this status.
    pub fn can_request_refund(&self) -> bool {
        matches!(
            self,
            OrderStatus::PaymentSucceeded
                | OrderStatus::Processing
                | OrderStatus::Shipping
                | OrderStatus::Shipped
                | OrderStatus::ReceivedByCustomer
        )
    }

    /// Returns true if fulfilment may move from this status to `next`.
    ///
    /// Payment outcomes are not covered here; they go through
    /// [`OrderStatus::accepts_payment_result`].
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        match (self, next) {
            (PaymentSucceeded, Processing)
            | (Processing, Shipping)
            | (Shipping, Shipped)
            | (Shipped, ReceivedByCustomer)
            | (RefundRequested, Refunded) => true,
            (current, RefundRequested) => current.can_request_refund(),
            _ => false,
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PaymentPending => "PaymentPending",
            OrderStatus::PaymentSucceeded => "PaymentSucceeded",
            OrderStatus::PaymentFailed => "PaymentFailed",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipping => "Shipping",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::ReceivedByCustomer => "ReceivedByCustomer",
            OrderStatus::RefundRequested => "RefundRequested",
            OrderStatus::Refunded => "Refunded",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownOrderStatus(pub String);

impl std::str::FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "PaymentPending" => OrderStatus::PaymentPending,
            "PaymentSucceeded" => OrderStatus::PaymentSucceeded,
            "PaymentFailed" => OrderStatus::PaymentFailed,
            "Processing" => OrderStatus::Processing,
            "Shipping" => OrderStatus::Shipping,
            "Shipped" => OrderStatus::Shipped,
            "ReceivedByCustomer" => OrderStatus::ReceivedByCustomer,
            "RefundRequested" => OrderStatus::RefundRequested,
            "Refunded" => OrderStatus::Refunded,
            other => return Err(UnknownOrderStatus(other.to_string())),
        };
        Ok(status)
    }
}

/// One entry of an order's append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHistoryEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OrderHistoryEntry {
    pub fn new(status: OrderStatus, timestamp: DateTime<Utc>, notes: Option<String>) -> Self {
        Self {
            status,
            timestamp,
            notes,
        }
    }
}
