//! Exemplar information update
//!
//! Postings with mandatory marking ("честный знак") cannot ship until each
//! exemplar carries its customs declaration number and marking code. This
//! handler merges the codes from the sign repository into the marketplace's
//! exemplar structure and pushes them back, then retries the shipment
//! transition.

use ozon_api::error::Outcome;
use ozon_api::types::{Exemplar, ExemplarMark};
use ozon_api::OzonApi;
use shared::message::{ExemplarInfoMessage, Lane, QueueMessage, WaitingShipmentMessage};
use std::sync::Arc;
use std::time::Duration;

use crate::orders::OrderStore;
use crate::queue::MessageDispatch;
use crate::services::{SignRepository, TokenProvider};

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Placeholder customs declaration when the sign repository has none
const GTD_ABSENT: &str = "Отсутствует";

pub struct ExemplarInfoDispatcher {
    queue: Arc<dyn MessageDispatch>,
    api: Arc<dyn OzonApi>,
    tokens: Arc<dyn TokenProvider>,
    store: Arc<OrderStore>,
    signs: Arc<dyn SignRepository>,
}

impl ExemplarInfoDispatcher {
    pub fn new(
        queue: Arc<dyn MessageDispatch>,
        api: Arc<dyn OzonApi>,
        tokens: Arc<dyn TokenProvider>,
        store: Arc<OrderStore>,
        signs: Arc<dyn SignRepository>,
    ) -> Self {
        Self {
            queue,
            api,
            tokens,
            store,
            signs,
        }
    }

    pub async fn handle(&self, message: &ExemplarInfoMessage) {
        let order = match self.store.find_by_id(message.order) {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::error!(order = %message.order, "Order not found for exemplar update");
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

        let mut state = match self.api.exemplar_status(&token.api, &order.number).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    number = %order.number,
                    error = %e,
                    "Failed to fetch exemplar status, retrying"
                );
                self.requeue(message, order.profile).await;
                return;
            }
        };

        if state.ship_available {
            // Nothing to fill in; go straight back to the shipment flow
            let _ = self
                .queue
                .dispatch(
                    QueueMessage::WaitingShipment(WaitingShipmentMessage {
                        order: message.order,
                    }),
                    None,
                    Lane::profile(order.profile),
                )
                .await;
            return;
        }

        let mut marks = self.signs.marks_for(order.id).into_iter();

        for product in &mut state.products {
            if product.exemplars.is_empty() {
                product.exemplars.push(Exemplar::default());
            }

            for exemplar in &mut product.exemplars {
                let mark = marks.next();

                exemplar.gtd = Some(
                    mark.as_ref()
                        .and_then(|m| m.gtd.clone())
                        .unwrap_or_else(|| GTD_ABSENT.to_string()),
                );

                if let Some(mark) = mark {
                    exemplar.marks = vec![ExemplarMark {
                        mark: mark.code,
                        mark_type: "mandatory_mark".to_string(),
                    }];
                }
            }
        }

        match self.api.exemplar_set(&token.api, &order.number, &state).await {
            Ok(Outcome::Success(())) | Ok(Outcome::Benign) => {
                tracing::info!(number = %order.number, "Pushed exemplar information");
            }
            Err(e) => {
                tracing::error!(
                    number = %order.number,
                    error = %e,
                    "Failed to push exemplar information, retrying"
                );
                self.requeue(message, order.profile).await;
                return;
            }
        }

        // Exemplars are in; retry the shipment transition
        let _ = self
            .queue
            .dispatch(
                QueueMessage::WaitingShipment(WaitingShipmentMessage {
                    order: message.order,
                }),
                Some(RETRY_DELAY),
                Lane::profile(order.profile),
            )
            .await;
    }

    async fn requeue(&self, message: &ExemplarInfoMessage, profile: shared::ProfileId) {
        let _ = self
            .queue
            .dispatch(
                QueueMessage::ExemplarInfo(message.clone()),
                Some(RETRY_DELAY),
                Lane::low(profile),
            )
            .await;
    }
}
