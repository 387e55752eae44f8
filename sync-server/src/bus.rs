//! Operator event broadcast
//!
//! Connected operator clients watch the order board in real time; the
//! cancellation flow pushes removal events here so a cancelled order
//! disappears from their screens without a refresh.

use tokio::sync::broadcast;

/// Events pushed to connected operator clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorEvent {
    /// An order left the active board (cancelled on the marketplace)
    OrderRemoved { number: String },
    /// An order needs manual attention (late cancellation)
    OrderFlagged { number: String, reason: Option<String> },
}

/// Broadcast bus for operator events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<OperatorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all subscribers.
    ///
    /// A bus without subscribers drops the event; that is fine — the order
    /// store remains the source of truth.
    pub fn publish(&self, event: OperatorEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OperatorEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(OperatorEvent::OrderRemoved {
            number: "O-1-1-1".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            OperatorEvent::OrderRemoved {
                number: "O-1-1-1".to_string()
            }
        );
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new(16);
        bus.publish(OperatorEvent::OrderRemoved {
            number: "O-1".to_string(),
        });
    }
}
