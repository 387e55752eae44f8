//! Order cancellation use-case
//!
//! A cancellation on the marketplace does not always mean the internal
//! order can be silently cancelled: once it is packaged or shipped there
//! are externally-visible side effects the system cannot undo, so the order
//! is flagged for manual review instead.

use shared::order::OrderStatus;
use std::sync::Arc;

use super::store::{OrderStore, OrderStoreError};
use super::translate::CancelOrderCommand;
use crate::bus::{EventBus, OperatorEvent};

/// Result of handling one cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The order was transitioned to cancelled
    Cancelled,
    /// The order was flagged for manual review (already in fulfillment)
    Flagged,
    /// Terminal state or unknown number: nothing to do
    Skipped,
}

pub struct CancelOrderHandler {
    store: Arc<OrderStore>,
    bus: EventBus,
}

impl CancelOrderHandler {
    pub fn new(store: Arc<OrderStore>, bus: EventBus) -> Self {
        Self { store, bus }
    }

    pub fn handle(&self, command: &CancelOrderCommand) -> Result<CancelOutcome, OrderStoreError> {
        let Some(order) = self.store.find_by_number(&command.number)? else {
            return Ok(CancelOutcome::Skipped);
        };

        // Terminal states cannot regress
        if order.status.is_terminal() {
            return Ok(CancelOutcome::Skipped);
        }

        if matches!(order.status, OrderStatus::New | OrderStatus::Unpaid) {
            self.store.set_status(&order.number, OrderStatus::Canceled)?;

            tracing::info!(number = %order.number, "Cancelled order");
            self.bus.publish(OperatorEvent::OrderRemoved {
                number: order.number.clone(),
            });

            return Ok(CancelOutcome::Cancelled);
        }

        // Already in fulfillment: a human has to decide what to unwind
        let reason = command.reason.clone();
        self.store.update(&order.number, |record| {
            record.flagged = true;
            record.comment = reason.clone().or(record.comment.take());
        })?;

        tracing::warn!(
            number = %order.number,
            status = ?order.status,
            reason = command.reason.as_deref().unwrap_or("-"),
            "Marketplace cancelled an order already in fulfillment, flagged for review"
        );
        self.bus.publish(OperatorEvent::OrderFlagged {
            number: order.number.clone(),
            reason: command.reason.clone(),
        });

        Ok(CancelOutcome::Flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::ids::{ProfileId, TokenId};
    use shared::order::DeliveryKind;
    use crate::orders::store::{NewOrderCommand, NewOrderProduct};

    fn seed(store: &OrderStore, number: &str, status: OrderStatus) {
        store
            .create(&NewOrderCommand {
                number: number.to_string(),
                status: OrderStatus::New,
                delivery: DeliveryKind::FbsOzon,
                profile: ProfileId::new(),
                token: TokenId::new(),
                created_at: Utc::now(),
                shipment_due: None,
                address: None,
                buyer_name: None,
                buyer_phone: None,
                comment: None,
                products: vec![NewOrderProduct {
                    article: "A".into(),
                    sku: 1,
                    price: 100,
                    currency: "RUB".into(),
                    quantity: 1,
                }],
            })
            .unwrap();
        if status != OrderStatus::New {
            store.set_status(number, status).unwrap();
        }
    }

    fn cancel(number: &str) -> CancelOrderCommand {
        CancelOrderCommand {
            number: number.to_string(),
            reason: Some("buyer changed mind".to_string()),
            profile: ProfileId::new(),
        }
    }

    fn handler(store: Arc<OrderStore>) -> CancelOrderHandler {
        CancelOrderHandler::new(store, EventBus::new(16))
    }

    #[test]
    fn test_new_order_cancels_directly() {
        let store = Arc::new(OrderStore::open_in_memory().unwrap());
        seed(&store, "O-1-1-1", OrderStatus::New);

        let outcome = handler(store.clone()).handle(&cancel("O-1-1-1")).unwrap();
        assert_eq!(outcome, CancelOutcome::Cancelled);
        assert_eq!(
            store.find_by_number("O-1-1-1").unwrap().unwrap().status,
            OrderStatus::Canceled
        );
    }

    #[test]
    fn test_terminal_states_are_untouched() {
        let store = Arc::new(OrderStore::open_in_memory().unwrap());
        seed(&store, "O-1-1-1", OrderStatus::Canceled);
        seed(&store, "O-2-2-2", OrderStatus::Completed);

        let handler = handler(store.clone());
        assert_eq!(handler.handle(&cancel("O-1-1-1")).unwrap(), CancelOutcome::Skipped);
        assert_eq!(handler.handle(&cancel("O-2-2-2")).unwrap(), CancelOutcome::Skipped);

        // Completed stays completed regardless of the marketplace report
        assert_eq!(
            store.find_by_number("O-2-2-2").unwrap().unwrap().status,
            OrderStatus::Completed
        );
    }

    #[test]
    fn test_packaged_order_is_flagged_not_cancelled() {
        let store = Arc::new(OrderStore::open_in_memory().unwrap());
        seed(&store, "O-1-1-1", OrderStatus::Package);

        let outcome = handler(store.clone()).handle(&cancel("O-1-1-1")).unwrap();
        assert_eq!(outcome, CancelOutcome::Flagged);

        let record = store.find_by_number("O-1-1-1").unwrap().unwrap();
        assert_eq!(record.status, OrderStatus::Package);
        assert!(record.flagged);
        assert_eq!(record.comment.as_deref(), Some("buyer changed mind"));
    }

    #[test]
    fn test_unknown_number_skips() {
        let store = Arc::new(OrderStore::open_in_memory().unwrap());
        let outcome = handler(store).handle(&cancel("O-missing")).unwrap();
        assert_eq!(outcome, CancelOutcome::Skipped);
    }
}
