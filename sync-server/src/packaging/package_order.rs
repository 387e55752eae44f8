//! Packaging orchestrator
//!
//! Reacts to an internal order reaching the packaging status under
//! marketplace-fulfilled delivery: re-fetches the canonical order detail,
//! computes the package split, submits it, persists the returned posting
//! numbers on the order-product lines and enqueues one label-generation
//! task per new posting.
//!
//! The dedup record is only saved after the ship call is confirmed, so a
//! redelivered message after a transient failure is treated as a first
//! attempt.

use ozon_api::error::{Outcome, OzonError};
use ozon_api::types::{Package, ShipRequest};
use ozon_api::OzonApi;
use shared::ids::OrderProductId;
use shared::message::{CreateLabelTaskMessage, Lane, OrderStatusMessage, QueueMessage};
use shared::order::{DeliveryKind, OrderStatus};
use std::sync::Arc;
use std::time::Duration;

use super::packing::{build_packages, ProductPacking};
use crate::dedup::Deduplicator;
use crate::orders::{OrderRecord, OrderStore};
use crate::queue::MessageDispatch;
use crate::services::{CatalogResolver, TokenProvider};

const DEDUP_NAMESPACE: &str = "ozon-orders";
const HANDLER_KEY: &str = "package-order";

/// Retry delay after a transient marketplace failure
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Base stagger before the first label task; subsequent postings add one
/// second each to smooth out the marketplace's per-posting rate limits
const LABEL_TASK_BASE_DELAY: u64 = 10;

/// While a split is in flight the new-order poll is paused briefly so the
/// half-split order cannot be re-ingested
const INGEST_PAUSE: Duration = Duration::from_secs(10);

pub struct PackageOrderDispatcher {
    dedup: Deduplicator,
    queue: Arc<dyn MessageDispatch>,
    api: Arc<dyn OzonApi>,
    tokens: Arc<dyn TokenProvider>,
    catalog: Arc<dyn CatalogResolver>,
    store: Arc<OrderStore>,
}

impl PackageOrderDispatcher {
    pub fn new(
        dedup: Deduplicator,
        queue: Arc<dyn MessageDispatch>,
        api: Arc<dyn OzonApi>,
        tokens: Arc<dyn TokenProvider>,
        catalog: Arc<dyn CatalogResolver>,
        store: Arc<OrderStore>,
    ) -> Self {
        Self {
            dedup,
            queue,
            api,
            tokens,
            catalog,
            store,
        }
    }

    pub async fn handle(&self, message: &OrderStatusMessage) {
        let order = match self.store.find_by_id(message.order) {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::error!(order = %message.order, "Order not found for packaging");
                return;
            }
            Err(e) => {
                tracing::error!(order = %message.order, error = %e, "Order store unavailable");
                return;
            }
        };

        if order.status != OrderStatus::Package {
            return;
        }

        if order.delivery != DeliveryKind::FbsOzon {
            return;
        }

        let guard = self
            .dedup
            .clone()
            .namespace(DEDUP_NAMESPACE)
            .keys([order.id.to_string().as_str(), HANDLER_KEY]);

        match guard.is_executed() {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(error = %e, "Dedup store unavailable");
                return;
            }
        }

        // Pause the new-order poll so the split's sibling postings are not
        // ingested as fresh orders mid-flight
        let ingest_pause = self
            .dedup
            .clone()
            .namespace(DEDUP_NAMESPACE)
            .ttl(INGEST_PAUSE)
            .keys([
                order.profile.to_string().as_str(),
                crate::schedule::new_orders::HANDLER_KEY,
            ]);
        let _ = ingest_pause.save();

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

        // Canonical detail: packaging parameters may have changed since
        // ingestion, the local projection is not trusted here
        let detail = match self.api.get_posting(&token.api, &order.number).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::error!(
                    number = %order.number,
                    error = %e,
                    "Failed to fetch order detail, rescheduling packaging"
                );
                self.requeue(message, order.profile).await;
                return;
            }
        };

        // Degenerate order: one product, one unit. Ship it as-is and skip
        // the posting-matching machinery entirely.
        if detail.products.len() == 1 && detail.total_quantity() == 1 {
            self.ship_single(&order, &token.api, &detail, &guard).await;
            return;
        }

        let mut packing = Vec::new();
        let mut line_by_sku: Vec<(i64, OrderProductId)> = Vec::new();

        for product in &detail.products {
            let Some(card) = self.catalog.resolve(&product.offer_id) else {
                tracing::error!(
                    article = %product.offer_id,
                    number = %order.number,
                    "No catalog card for article, cannot package order"
                );
                return;
            };

            let Some(line) = order.products.iter().find(|l| l.article == product.offer_id) else {
                tracing::error!(
                    article = %product.offer_id,
                    number = %order.number,
                    "No order line matches the marketplace product"
                );
                return;
            };

            line_by_sku.push((product.sku, line.id));
            packing.push(ProductPacking {
                sku: product.sku,
                quantity: product.quantity,
                capacity: card.package_capacity,
            });
        }

        let request = ShipRequest {
            posting_number: order.number.clone(),
            packages: build_packages(&packing),
        };

        let result = match self.api.ship(&token.api, &request).await {
            Ok(Outcome::Success(result)) => result,
            Ok(Outcome::Benign) => {
                tracing::warn!(
                    number = %order.number,
                    "Order was already split remotely; postings not persisted locally"
                );
                return;
            }
            Err(OzonError::InvalidArgument(reason)) => {
                tracing::error!(number = %order.number, reason, "Packaging request contract violation");
                return;
            }
            Err(e) => {
                tracing::error!(
                    number = %order.number,
                    error = %e,
                    "Failed to split order, rescheduling packaging"
                );
                self.requeue(message, order.profile).await;
                return;
            }
        };

        tracing::info!(
            number = %order.number,
            postings = result.result.len(),
            "Order split into postings"
        );

        // The split is confirmed; retries from here on are benign
        if let Err(e) = guard.save() {
            tracing::error!(error = %e, "Failed to save packaging dedup record");
        }

        let mut label_index: u64 = 0;
        for (sku, line_id) in line_by_sku {
            let postings = result.postings_for_sku(sku);

            if postings.is_empty() {
                tracing::error!(
                    number = %order.number,
                    sku,
                    "No posting metadata for product; its labels cannot be printed"
                );
                continue;
            }

            for posting in postings {
                match self
                    .store
                    .attach_posting(&order.number, line_id, &posting.posting_number)
                {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::error!(
                            number = %order.number,
                            posting = %posting.posting_number,
                            "Order line vanished while attaching posting"
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            number = %order.number,
                            posting = %posting.posting_number,
                            error = %e,
                            "Failed to persist posting number; attach it manually"
                        );
                    }
                }

                let _ = self
                    .queue
                    .dispatch(
                        QueueMessage::CreateLabelTask(CreateLabelTaskMessage {
                            token: token_id,
                            posting_number: posting.posting_number.clone(),
                        }),
                        Some(Duration::from_secs(LABEL_TASK_BASE_DELAY + label_index)),
                        Lane::orders(),
                    )
                    .await;
                label_index += 1;
            }
        }
    }

    /// Single-unit fast path: one package, one label task, no matching
    async fn ship_single(
        &self,
        order: &OrderRecord,
        api_token: &ozon_api::client::ApiToken,
        detail: &ozon_api::types::Posting,
        guard: &crate::dedup::DedupGuard,
    ) {
        let product = &detail.products[0];
        let request = ShipRequest {
            posting_number: order.number.clone(),
            packages: vec![Package {
                products: vec![ozon_api::types::PackageProduct {
                    product_id: product.sku,
                    quantity: 1,
                }],
            }],
        };

        match self.api.ship(api_token, &request).await {
            Ok(Outcome::Success(_)) | Ok(Outcome::Benign) => {}
            Err(e) => {
                tracing::error!(
                    number = %order.number,
                    error = %e,
                    "Failed to ship single-unit order, rescheduling"
                );
                self.requeue(&OrderStatusMessage { order: order.id }, order.profile)
                    .await;
                return;
            }
        }

        if let Err(e) = guard.save() {
            tracing::error!(error = %e, "Failed to save packaging dedup record");
        }

        if let Some(token_id) = order.token {
            let _ = self
                .queue
                .dispatch(
                    QueueMessage::CreateLabelTask(CreateLabelTaskMessage {
                        token: token_id,
                        posting_number: order.number.clone(),
                    }),
                    Some(Duration::from_secs(LABEL_TASK_BASE_DELAY)),
                    Lane::orders(),
                )
                .await;
        }

        tracing::info!(number = %order.number, "Shipped single-unit order");
    }

    async fn requeue(&self, message: &OrderStatusMessage, profile: shared::ProfileId) {
        let _ = self
            .queue
            .dispatch(
                QueueMessage::OrderStatus(message.clone()),
                Some(RETRY_DELAY),
                Lane::low(profile),
            )
            .await;
    }
}
