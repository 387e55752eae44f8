//! Queue message set
//!
//! Every asynchronous step carries its full state in the message payload;
//! nothing is shared in process memory between workflow steps. Delivery is
//! at-least-once, so every handler deduplicates or is idempotent.

use crate::ids::{OrderId, ProfileId, TokenId};
use serde::{Deserialize, Serialize};

/// Named queue lane.
///
/// Transient failures are parked on a profile's low-priority lane so retries
/// never starve first-attempt traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane(pub String);

impl Lane {
    /// Default lane for the Ozon order workflows
    pub fn orders() -> Self {
        Lane("ozon-orders".to_string())
    }

    /// Per-profile lane
    pub fn profile(profile: ProfileId) -> Self {
        Lane(profile.to_string())
    }

    /// Per-profile low-priority retry lane
    pub fn low(profile: ProfileId) -> Self {
        Lane(format!("{profile}-low"))
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Poll the marketplace for new (awaiting packaging) postings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrdersPollMessage {
    pub profile: ProfileId,
    /// Explicit lookback in seconds; `None` uses the scheduler default
    pub interval_secs: Option<u64>,
}

/// Poll the marketplace for cancelled postings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrdersPollMessage {
    pub profile: ProfileId,
    pub interval_secs: Option<u64>,
}

/// Split a multi-unit order into single-unit postings without packaging it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitOrderMessage {
    pub profile: ProfileId,
    pub token: TokenId,
    pub order_number: String,
}

/// An internal order changed status; dispatched to every status-reactive
/// handler (packaging, stickers, DBS propagation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusMessage {
    pub order: OrderId,
}

/// Step A of the label pipeline: create an asynchronous label task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLabelTaskMessage {
    pub token: TokenId,
    pub posting_number: String,
}

/// Step B of the label pipeline: poll a label task until the file is ready
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollLabelTaskMessage {
    pub token: TokenId,
    pub posting_number: String,
    pub task_id: i64,
}

/// Step C of the label pipeline: serve the sticker from cache, fetching the
/// direct label on a miss, and verify readability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchLabelMessage {
    pub token: TokenId,
    pub posting_number: String,
}

/// Push exemplar (marking code) information for an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExemplarInfoMessage {
    pub order: OrderId,
}

/// Move an order into the awaiting-shipment state once exemplar data is set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingShipmentMessage {
    pub order: OrderId,
}

/// Union of every message the workers consume
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueMessage {
    NewOrdersPoll(NewOrdersPollMessage),
    CancelOrdersPoll(CancelOrdersPollMessage),
    SplitOrder(SplitOrderMessage),
    OrderStatus(OrderStatusMessage),
    CreateLabelTask(CreateLabelTaskMessage),
    PollLabelTask(PollLabelTaskMessage),
    FetchLabel(FetchLabelMessage),
    ExemplarInfo(ExemplarInfoMessage),
    WaitingShipment(WaitingShipmentMessage),
}

impl QueueMessage {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            QueueMessage::NewOrdersPoll(_) => "new_orders_poll",
            QueueMessage::CancelOrdersPoll(_) => "cancel_orders_poll",
            QueueMessage::SplitOrder(_) => "split_order",
            QueueMessage::OrderStatus(_) => "order_status",
            QueueMessage::CreateLabelTask(_) => "create_label_task",
            QueueMessage::PollLabelTask(_) => "poll_label_task",
            QueueMessage::FetchLabel(_) => "fetch_label",
            QueueMessage::ExemplarInfo(_) => "exemplar_info",
            QueueMessage::WaitingShipment(_) => "waiting_shipment",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roundtrip() {
        let msg = QueueMessage::CreateLabelTask(CreateLabelTaskMessage {
            token: TokenId::new(),
            posting_number: "75119001-0020-1".to_string(),
        });

        let json = serde_json::to_string(&msg).unwrap();
        let back: QueueMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), "create_label_task");
    }

    #[test]
    fn test_lane_names() {
        let profile = ProfileId::new();
        assert_eq!(Lane::orders().0, "ozon-orders");
        assert!(Lane::low(profile).0.ends_with("-low"));
    }
}
