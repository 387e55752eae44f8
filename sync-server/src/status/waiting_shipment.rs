//! Awaiting-shipment transition
//!
//! Moves a packaged order towards shipment: verifies the exemplar data is
//! complete (routing to the exemplar-info update when it is not), then
//! submits one package per product and kicks off label generation for the
//! posting.

use ozon_api::error::Outcome;
use ozon_api::types::{Package, PackageProduct, ShipRequest};
use ozon_api::OzonApi;
use shared::message::{
    CreateLabelTaskMessage, ExemplarInfoMessage, Lane, QueueMessage, WaitingShipmentMessage,
};
use std::sync::Arc;
use std::time::Duration;

use crate::orders::OrderStore;
use crate::queue::MessageDispatch;
use crate::services::TokenProvider;

const RETRY_DELAY: Duration = Duration::from_secs(5);
const LABEL_TASK_DELAY: Duration = Duration::from_secs(10);

pub struct WaitingShipmentDispatcher {
    queue: Arc<dyn MessageDispatch>,
    api: Arc<dyn OzonApi>,
    tokens: Arc<dyn TokenProvider>,
    store: Arc<OrderStore>,
}

impl WaitingShipmentDispatcher {
    pub fn new(
        queue: Arc<dyn MessageDispatch>,
        api: Arc<dyn OzonApi>,
        tokens: Arc<dyn TokenProvider>,
        store: Arc<OrderStore>,
    ) -> Self {
        Self {
            queue,
            api,
            tokens,
            store,
        }
    }

    pub async fn handle(&self, message: &WaitingShipmentMessage) {
        let order = match self.store.find_by_id(message.order) {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::error!(order = %message.order, "Order not found for shipment transition");
                return;
            }
            Err(e) => {
                tracing::error!(order = %message.order, error = %e, "Order store unavailable");
                return;
            }
        };

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

        // The posting can only move to shipment once its exemplar data is
        // complete; otherwise push the data first and come back later
        match self.api.exemplar_status(&token.api, &order.number).await {
            Ok(state) if state.ship_available => {}
            Ok(_) => {
                tracing::info!(
                    number = %order.number,
                    "Exemplar data incomplete, dispatching exemplar update"
                );
                let _ = self
                    .queue
                    .dispatch(
                        QueueMessage::ExemplarInfo(ExemplarInfoMessage {
                            order: message.order,
                        }),
                        None,
                        Lane::profile(order.profile),
                    )
                    .await;
                return;
            }
            Err(e) => {
                tracing::warn!(
                    number = %order.number,
                    error = %e,
                    "Failed to check exemplar status, retrying"
                );
                self.requeue(message, order.profile).await;
                return;
            }
        }

        let detail = match self.api.get_posting(&token.api, &order.number).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::error!(
                    number = %order.number,
                    error = %e,
                    "Failed to fetch order detail, retrying shipment transition"
                );
                self.requeue(message, order.profile).await;
                return;
            }
        };

        // One package per product line, the full quantity in each
        let packages: Vec<Package> = detail
            .products
            .iter()
            .map(|p| Package {
                products: vec![PackageProduct {
                    product_id: p.sku,
                    quantity: p.quantity,
                }],
            })
            .collect();

        if packages.is_empty() {
            tracing::warn!(number = %order.number, "Order has no products to ship");
            return;
        }

        let request = ShipRequest {
            posting_number: order.number.clone(),
            packages,
        };

        match self.api.ship(&token.api, &request).await {
            Ok(Outcome::Success(_)) | Ok(Outcome::Benign) => {
                tracing::info!(number = %order.number, "Order moved to awaiting shipment");
            }
            Err(e) => {
                tracing::error!(
                    number = %order.number,
                    error = %e,
                    "Failed to move order to awaiting shipment, retrying"
                );
                self.requeue(message, order.profile).await;
                return;
            }
        }

        let _ = self
            .queue
            .dispatch(
                QueueMessage::CreateLabelTask(CreateLabelTaskMessage {
                    token: token_id,
                    posting_number: order.number.clone(),
                }),
                Some(LABEL_TASK_DELAY),
                Lane::orders(),
            )
            .await;
    }

    async fn requeue(&self, message: &WaitingShipmentMessage, profile: shared::ProfileId) {
        let _ = self
            .queue
            .dispatch(
                QueueMessage::WaitingShipment(message.clone()),
                Some(RETRY_DELAY),
                Lane::low(profile),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fbs_posting, seed_order_full, test_tokens, FakeOzon, RecordingDispatch};
    use shared::order::OrderStatus;

    fn fixture(api: FakeOzon) -> (
        WaitingShipmentDispatcher,
        Arc<OrderStore>,
        Arc<FakeOzon>,
        Arc<RecordingDispatch>,
        shared::ProfileId,
        shared::TokenId,
    ) {
        let (tokens, profile) = test_tokens();
        let token = tokens.token.id;
        let store = Arc::new(OrderStore::open_in_memory().unwrap());
        let queue = Arc::new(RecordingDispatch::default());
        let api = Arc::new(api);

        let dispatcher = WaitingShipmentDispatcher::new(queue.clone(), api.clone(), tokens, store.clone());
        (dispatcher, store, api, queue, profile, token)
    }

    #[tokio::test]
    async fn test_ships_and_requests_label_when_exemplar_complete() {
        let api = FakeOzon::default().with_detail(fbs_posting("1-1-1", &[("ART-1", 10, 2)]));
        let (dispatcher, store, api, queue, profile, token) = fixture(api);

        let record = seed_order_full(
            &store,
            "O-1-1-1",
            OrderStatus::Package,
            profile,
            Some(token),
            &[("ART-1", 10, 2)],
        );

        dispatcher
            .handle(&WaitingShipmentMessage { order: record.id })
            .await;

        assert_eq!(api.ship_calls.lock().unwrap().len(), 1);
        let kinds: Vec<_> = queue.messages().iter().map(|m| m.kind()).collect();
        assert_eq!(kinds, vec!["create_label_task"]);
    }

    #[tokio::test]
    async fn test_incomplete_exemplar_routes_to_update() {
        let api = FakeOzon::default()
            .with_detail(fbs_posting("1-1-1", &[("ART-1", 10, 2)]))
            .with_exemplar_unavailable();
        let (dispatcher, store, api, queue, profile, token) = fixture(api);

        let record = seed_order_full(
            &store,
            "O-1-1-1",
            OrderStatus::Package,
            profile,
            Some(token),
            &[("ART-1", 10, 2)],
        );

        dispatcher
            .handle(&WaitingShipmentMessage { order: record.id })
            .await;

        assert!(api.ship_calls.lock().unwrap().is_empty());
        let kinds: Vec<_> = queue.messages().iter().map(|m| m.kind()).collect();
        assert_eq!(kinds, vec!["exemplar_info"]);
    }
}
