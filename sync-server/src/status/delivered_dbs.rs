//! DBS delivered report
//!
//! A completed merchant-delivered order is reported to the marketplace as
//! delivered. The call is naturally idempotent — "already delivered" comes
//! back as a benign outcome — so no dedup record is needed here.

use ozon_api::error::Outcome;
use ozon_api::OzonApi;
use shared::message::OrderStatusMessage;
use shared::order::{DeliveryKind, OrderStatus};
use std::sync::Arc;

use crate::orders::OrderStore;
use crate::services::TokenProvider;

pub struct DeliveredDbsDispatcher {
    api: Arc<dyn OzonApi>,
    tokens: Arc<dyn TokenProvider>,
    store: Arc<OrderStore>,
}

impl DeliveredDbsDispatcher {
    pub fn new(
        api: Arc<dyn OzonApi>,
        tokens: Arc<dyn TokenProvider>,
        store: Arc<OrderStore>,
    ) -> Self {
        Self { api, tokens, store }
    }

    pub async fn handle(&self, message: &OrderStatusMessage) {
        let order = match self.store.find_by_id(message.order) {
            Ok(Some(order)) => order,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(order = %message.order, error = %e, "Order store unavailable");
                return;
            }
        };

        if order.status != OrderStatus::Completed || order.delivery != DeliveryKind::DbsOzon {
            return;
        }

        let Some(token_id) = order.token else {
            tracing::warn!(
                number = %order.number,
                "Order has no authorization token; it may have been created manually"
            );
            return;
        };

        let Some(token) = self.tokens.token(token_id) else {
            tracing::warn!(number = %order.number, token = %token_id, "Authorization token not found");
            return;
        };

        match self.api.delivered(&token.api, &order.number).await {
            Ok(Outcome::Success(())) | Ok(Outcome::Benign) => {
                tracing::info!(number = %order.number, "Reported order as delivered");
            }
            Err(e) => {
                tracing::error!(
                    number = %order.number,
                    error = %e,
                    "Failed to report delivery; the next status event retries"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_order_full, test_tokens, FakeOzon};

    #[tokio::test]
    async fn test_completed_dbs_order_reports_delivered() {
        let (tokens, profile) = test_tokens();
        let token = tokens.token.id;
        let store = Arc::new(OrderStore::open_in_memory().unwrap());
        let api = Arc::new(FakeOzon::default());

        let dispatcher = DeliveredDbsDispatcher::new(api.clone(), tokens, store.clone());

        let record = seed_order_full(
            &store,
            "O-1-1-1",
            OrderStatus::Completed,
            profile,
            Some(token),
            &[("ART-1", 10, 1)],
        );
        store
            .update("O-1-1-1", |r| r.delivery = DeliveryKind::DbsOzon)
            .unwrap();

        dispatcher
            .handle(&OrderStatusMessage { order: record.id })
            .await;

        let calls = api.transition_calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("delivered".to_string(), "O-1-1-1".to_string())]);
    }

    #[tokio::test]
    async fn test_fbs_or_incomplete_orders_are_ignored() {
        let (tokens, profile) = test_tokens();
        let token = tokens.token.id;
        let store = Arc::new(OrderStore::open_in_memory().unwrap());
        let api = Arc::new(FakeOzon::default());

        let dispatcher = DeliveredDbsDispatcher::new(api.clone(), tokens, store.clone());

        // Completed but FBS
        let fbs = seed_order_full(
            &store,
            "O-1-1-1",
            OrderStatus::Completed,
            profile,
            Some(token),
            &[("ART-1", 10, 1)],
        );
        // DBS but still packaging
        let pending = seed_order_full(
            &store,
            "O-2-2-2",
            OrderStatus::Package,
            profile,
            Some(token),
            &[("ART-1", 10, 1)],
        );
        store
            .update("O-2-2-2", |r| r.delivery = DeliveryKind::DbsOzon)
            .unwrap();

        dispatcher.handle(&OrderStatusMessage { order: fbs.id }).await;
        dispatcher.handle(&OrderStatusMessage { order: pending.id }).await;

        assert!(api.transition_calls.lock().unwrap().is_empty());
    }
}
