//! Per-order sticker fan-out
//!
//! When an order enters packaging, every posting it already has (siblings
//! from a prior split plus its own number) gets a cache-first fetch job, so
//! the stickers are warm by the time the warehouse prints them.

use ozon_api::OzonApi;
use shared::message::{FetchLabelMessage, Lane, OrderStatusMessage, QueueMessage};
use shared::order::OrderStatus;
use std::sync::Arc;
use std::time::Duration;

use crate::dedup::Deduplicator;
use crate::orders::OrderStore;
use crate::queue::MessageDispatch;
use crate::services::TokenProvider;

const DEDUP_NAMESPACE: &str = "ozon-orders";
const HANDLER_KEY: &str = "order-stickers";

const FETCH_DELAY: Duration = Duration::from_secs(5);

pub struct OrderStickersDispatcher {
    dedup: Deduplicator,
    queue: Arc<dyn MessageDispatch>,
    api: Arc<dyn OzonApi>,
    tokens: Arc<dyn TokenProvider>,
    store: Arc<OrderStore>,
}

impl OrderStickersDispatcher {
    pub fn new(
        dedup: Deduplicator,
        queue: Arc<dyn MessageDispatch>,
        api: Arc<dyn OzonApi>,
        tokens: Arc<dyn TokenProvider>,
        store: Arc<OrderStore>,
    ) -> Self {
        Self {
            dedup,
            queue,
            api,
            tokens,
            store,
        }
    }

    pub async fn handle(&self, message: &OrderStatusMessage) {
        let guard = self
            .dedup
            .clone()
            .namespace(DEDUP_NAMESPACE)
            .keys([message.order.to_string().as_str(), HANDLER_KEY]);

        match guard.is_executed() {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(error = %e, "Dedup store unavailable");
                return;
            }
        }

        let order = match self.store.find_by_id(message.order) {
            Ok(Some(order)) => order,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(order = %message.order, error = %e, "Order store unavailable");
                return;
            }
        };

        if order.status != OrderStatus::Package {
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

        let detail = match self.api.get_posting(&token.api, &order.number).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::warn!(
                    number = %order.number,
                    error = %e,
                    "Failed to enumerate postings for sticker prefetch"
                );
                return;
            }
        };

        let mut postings: Vec<String> = detail
            .related_posting_numbers()
            .iter()
            .cloned()
            .collect();
        postings.push(order.number.clone());

        for posting in &postings {
            let _ = self
                .queue
                .dispatch(
                    QueueMessage::FetchLabel(FetchLabelMessage {
                        token: token_id,
                        posting_number: posting.clone(),
                    }),
                    Some(FETCH_DELAY),
                    Lane::orders(),
                )
                .await;
        }

        tracing::info!(
            number = %order.number,
            postings = postings.len(),
            "Dispatched sticker prefetch for order postings"
        );

        if let Err(e) = guard.save() {
            tracing::error!(error = %e, "Failed to save sticker fan-out dedup record");
        }
    }
}
