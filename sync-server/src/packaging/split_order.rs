//! Pre-packaging split
//!
//! Multi-unit marketplace-fulfilled orders are split into single-unit
//! postings before ingestion; the split postings then arrive through the
//! regular new-order poll one by one. The order itself is not packaged
//! here.

use ozon_api::error::Outcome;
use ozon_api::types::{Package, PackageProduct, ShipRequest};
use ozon_api::OzonApi;
use shared::message::{Lane, QueueMessage, SplitOrderMessage};
use std::sync::Arc;
use std::time::Duration;

use crate::dedup::Deduplicator;
use crate::queue::MessageDispatch;
use crate::services::TokenProvider;

const DEDUP_NAMESPACE: &str = "ozon-orders";
const HANDLER_KEY: &str = "split-order";

const RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct SplitOrderDispatcher {
    dedup: Deduplicator,
    queue: Arc<dyn MessageDispatch>,
    api: Arc<dyn OzonApi>,
    tokens: Arc<dyn TokenProvider>,
}

impl SplitOrderDispatcher {
    pub fn new(
        dedup: Deduplicator,
        queue: Arc<dyn MessageDispatch>,
        api: Arc<dyn OzonApi>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            dedup,
            queue,
            api,
            tokens,
        }
    }

    pub async fn handle(&self, message: &SplitOrderMessage) {
        let guard = self
            .dedup
            .clone()
            .namespace(DEDUP_NAMESPACE)
            .keys([message.order_number.as_str(), HANDLER_KEY]);

        match guard.is_executed() {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(error = %e, "Dedup store unavailable");
                return;
            }
        }

        let Some(token) = self.tokens.token(message.token) else {
            tracing::warn!(
                order = %message.order_number,
                token = %message.token,
                "Authorization token not found"
            );
            return;
        };

        let detail = match self.api.get_posting(&token.api, &message.order_number).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::error!(
                    order = %message.order_number,
                    error = %e,
                    "Failed to fetch order for splitting, rescheduling"
                );
                self.requeue(message).await;
                return;
            }
        };

        // Nothing to split
        if detail.total_quantity() <= 1 {
            let _ = guard.save();
            return;
        }

        // One single-unit package per ordered unit of every product
        let mut packages = Vec::new();
        for product in &detail.products {
            for _ in 0..product.quantity {
                packages.push(Package {
                    products: vec![PackageProduct {
                        product_id: product.sku,
                        quantity: 1,
                    }],
                });
            }
        }

        if packages.is_empty() {
            let _ = guard.save();
            return;
        }

        let request = ShipRequest {
            posting_number: message.order_number.clone(),
            packages,
        };

        match self.api.ship(&token.api, &request).await {
            Ok(Outcome::Success(result)) => {
                tracing::info!(
                    order = %message.order_number,
                    postings = result.result.len(),
                    "Split order into single-unit postings"
                );
            }
            Ok(Outcome::Benign) => {
                tracing::warn!(order = %message.order_number, "Order was already split remotely");
            }
            Err(e) => {
                tracing::error!(
                    order = %message.order_number,
                    error = %e,
                    "Failed to split order, rescheduling"
                );
                self.requeue(message).await;
                return;
            }
        }

        if let Err(e) = guard.save() {
            tracing::error!(error = %e, "Failed to save split dedup record");
        }
    }

    async fn requeue(&self, message: &SplitOrderMessage) {
        let _ = self
            .queue
            .dispatch(
                QueueMessage::SplitOrder(message.clone()),
                Some(RETRY_DELAY),
                Lane::low(message.profile),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::DedupStore;
    use crate::testutil::{fbs_posting, test_tokens, FakeOzon, RecordingDispatch};

    fn dispatcher(api: FakeOzon) -> (SplitOrderDispatcher, Arc<FakeOzon>, Arc<RecordingDispatch>, SplitOrderMessage) {
        let (tokens, profile) = test_tokens();
        let token = tokens.token.id;
        let api = Arc::new(api);
        let queue = Arc::new(RecordingDispatch::default());

        let dispatcher = SplitOrderDispatcher::new(
            Deduplicator::new(Arc::new(DedupStore::open_in_memory().unwrap())),
            queue.clone(),
            api.clone(),
            tokens,
        );

        let message = SplitOrderMessage {
            profile,
            token,
            order_number: "1-1-1".to_string(),
        };

        (dispatcher, api, queue, message)
    }

    #[tokio::test]
    async fn test_split_emits_one_unit_per_package() {
        let (dispatcher, api, _queue, message) =
            dispatcher(FakeOzon::default().with_detail(fbs_posting("1-1-1", &[("ART-1", 10, 2), ("ART-2", 20, 1)])));

        dispatcher.handle(&message).await;

        let calls = api.ship_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].packages.len(), 3);
        assert!(calls[0]
            .packages
            .iter()
            .all(|p| p.products.len() == 1 && p.products[0].quantity == 1));
    }

    #[tokio::test]
    async fn test_single_unit_order_is_not_split() {
        let (dispatcher, api, _queue, message) =
            dispatcher(FakeOzon::default().with_detail(fbs_posting("1-1-1", &[("ART-1", 10, 1)])));

        dispatcher.handle(&message).await;
        assert!(api.ship_calls.lock().unwrap().is_empty());

        // The no-op is still recorded: a redelivery does not re-fetch
        dispatcher.handle(&message).await;
    }

    #[tokio::test]
    async fn test_redelivery_after_success_is_suppressed() {
        let (dispatcher, api, _queue, message) =
            dispatcher(FakeOzon::default().with_detail(fbs_posting("1-1-1", &[("ART-1", 10, 2)])));

        dispatcher.handle(&message).await;
        dispatcher.handle(&message).await;

        assert_eq!(api.ship_calls.lock().unwrap().len(), 1);
    }
}
