//! DBS ready-for-pickup report
//!
//! When a merchant-delivered order becomes ready for pickup, the
//! marketplace is told the posting is in delivery. Guarded by a dedup
//! record per order, mirroring the at-least-once redelivery of the status
//! message.

use ozon_api::error::Outcome;
use ozon_api::OzonApi;
use shared::message::OrderStatusMessage;
use shared::order::{DeliveryKind, OrderStatus};
use std::sync::Arc;

use crate::dedup::Deduplicator;
use crate::orders::OrderStore;
use crate::services::TokenProvider;

const DEDUP_NAMESPACE: &str = "ozon-orders";
const HANDLER_KEY: &str = "delivery-dbs";

pub struct DeliveryDbsDispatcher {
    dedup: Deduplicator,
    api: Arc<dyn OzonApi>,
    tokens: Arc<dyn TokenProvider>,
    store: Arc<OrderStore>,
}

impl DeliveryDbsDispatcher {
    pub fn new(
        dedup: Deduplicator,
        api: Arc<dyn OzonApi>,
        tokens: Arc<dyn TokenProvider>,
        store: Arc<OrderStore>,
    ) -> Self {
        Self {
            dedup,
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

        if order.delivery != DeliveryKind::DbsOzon {
            // Never relevant for this order; suppress future redeliveries
            let _ = guard.save();
            return;
        }

        if order.status != OrderStatus::Extradition {
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

        match self.api.delivering(&token.api, &order.number).await {
            Ok(Outcome::Success(())) | Ok(Outcome::Benign) => {
                tracing::info!(number = %order.number, "Reported order as in delivery");
                let _ = guard.save();
            }
            Err(e) => {
                tracing::error!(
                    number = %order.number,
                    error = %e,
                    "Failed to report delivery start; the next status event retries"
                );
            }
        }
    }
}
