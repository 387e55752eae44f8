//! New-order poll handler
//!
//! Discovers postings awaiting packaging and ingests them as internal
//! orders. The whole poll runs under a short-lived rate-limit guard (saved
//! before the work, deleted at the end) so overlapping polls for one
//! profile cannot run concurrently and a crash mid-run only wedges the
//! profile for one TTL window.

use chrono::{Local, Utc};
use ozon_api::types::{ListPostingsRequest, PostingStatus};
use ozon_api::OzonApi;
use shared::message::{Lane, NewOrdersPollMessage, QueueMessage, SplitOrderMessage};
use shared::order::{order_root, DeliveryKind};
use std::sync::Arc;
use std::time::Duration;

use super::window;
use crate::dedup::Deduplicator;
use crate::orders::{NewOrderHandler, NewOrderOutcome};
use crate::queue::MessageDispatch;
use crate::services::{CatalogResolver, Geocoder, TokenProvider, WarehouseLocator};

/// Dedup namespace shared by the Ozon order workflows
pub(crate) const DEDUP_NAMESPACE: &str = "ozon-orders";

/// Handler component of the dedup keys; the packaging orchestrator also
/// saves a short-lived record under this key to pause ingestion mid-split
pub(crate) const HANDLER_KEY: &str = "new-orders-schedule";

/// Once ingested, an order must never be re-ingested; a week of suppression
/// outlives every observable poll window
const ORDER_DEDUP_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub struct NewOrdersDispatcher {
    dedup: Deduplicator,
    queue: Arc<dyn MessageDispatch>,
    api: Arc<dyn OzonApi>,
    tokens: Arc<dyn TokenProvider>,
    catalog: Arc<dyn CatalogResolver>,
    warehouses: Arc<dyn WarehouseLocator>,
    geocoder: Arc<dyn Geocoder>,
    handler: Arc<NewOrderHandler>,
    poll_period: Duration,
}

impl NewOrdersDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dedup: Deduplicator,
        queue: Arc<dyn MessageDispatch>,
        api: Arc<dyn OzonApi>,
        tokens: Arc<dyn TokenProvider>,
        catalog: Arc<dyn CatalogResolver>,
        warehouses: Arc<dyn WarehouseLocator>,
        geocoder: Arc<dyn Geocoder>,
        handler: Arc<NewOrderHandler>,
        poll_period: Duration,
    ) -> Self {
        Self {
            dedup,
            queue,
            api,
            tokens,
            catalog,
            warehouses,
            geocoder,
            handler,
            poll_period,
        }
    }

    pub async fn handle(&self, message: &NewOrdersPollMessage) {
        let rate_limit = self
            .dedup
            .clone()
            .namespace(DEDUP_NAMESPACE)
            .ttl(self.poll_period)
            .keys([message.profile.to_string().as_str(), HANDLER_KEY]);

        match rate_limit.is_executed() {
            Ok(true) => {
                tracing::debug!(profile = %message.profile, "New-order poll already running, skipping");
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(profile = %message.profile, error = %e, "Dedup store unavailable");
                return;
            }
        }

        // Pre-save: an overlapping poll must bail even if this run fails
        if let Err(e) = rate_limit.save() {
            tracing::error!(profile = %message.profile, error = %e, "Failed to save rate-limit record");
            return;
        }

        let explicit = message.interval_secs.map(Duration::from_secs);
        let lookback = window::lookback(Local::now().naive_local(), explicit, window::NEW_ORDERS_DEFAULT);

        for token in self.tokens.tokens_for(message.profile) {
            let request = ListPostingsRequest {
                status: PostingStatus::AwaitingPackaging,
                since: Utc::now() - lookback,
                to: Utc::now(),
                warehouse_id: Some(token.api.warehouse_id),
            };

            let postings = match self.api.list_postings(&token.api, &request).await {
                Ok(postings) => postings,
                Err(e) => {
                    tracing::error!(
                        profile = %message.profile,
                        error = %e,
                        "Failed to list new postings"
                    );
                    continue;
                }
            };

            tracing::debug!(
                profile = %message.profile,
                count = postings.len(),
                lookback_secs = lookback.as_secs(),
                "Fetched awaiting-packaging postings"
            );

            for posting in &postings {
                // Key on the logical order, not the posting: siblings of an
                // order that is about to be split must not each create an
                // internal order
                let order_guard = self
                    .dedup
                    .clone()
                    .namespace(DEDUP_NAMESPACE)
                    .ttl(ORDER_DEDUP_TTL)
                    .keys([order_root(&posting.posting_number), HANDLER_KEY]);

                match order_guard.is_executed() {
                    Ok(true) => continue,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Dedup store unavailable");
                        continue;
                    }
                }

                let mut command =
                    crate::orders::new_order_command(posting, message.profile, token.id);

                match command.delivery {
                    DeliveryKind::FbsOzon => {
                        // Shipment leaves from the seller warehouse
                        match self.warehouses.locate(message.profile) {
                            Some(point) => command.address = Some(point.as_address()),
                            None => {
                                tracing::warn!(
                                    profile = %message.profile,
                                    posting = %posting.posting_number,
                                    "Warehouse location missing, skipping order"
                                );
                                continue;
                            }
                        }
                    }
                    DeliveryKind::DbsOzon => {
                        // Buyer contact data only appears on the detail view
                        let detail = match self.api.get_posting(&token.api, &posting.posting_number).await {
                            Ok(detail) => detail,
                            Err(e) => {
                                tracing::warn!(
                                    posting = %posting.posting_number,
                                    error = %e,
                                    "Failed to fetch posting detail, retrying on the next poll"
                                );
                                continue;
                            }
                        };

                        if let Some(customer) = &detail.customer {
                            command.buyer_name = customer.name.clone().or(command.buyer_name);
                            command.buyer_phone = customer.phone.clone().or(command.buyer_phone);
                            if let Some(address) = customer
                                .address
                                .as_ref()
                                .and_then(|a| a.address_tail.as_deref())
                            {
                                command.address = Some(self.geocoder.normalize(address));
                            }
                        }
                    }
                }

                // Catalog resolution failing is a data-integrity fatal: the
                // whole batch aborts and the rate-limit pre-save is rolled
                // back so a corrected catalog takes effect immediately
                for product in &command.products {
                    if self.catalog.resolve(&product.article).is_none() {
                        tracing::error!(
                            article = %product.article,
                            posting = %posting.posting_number,
                            "No catalog card for article, aborting poll batch"
                        );
                        let _ = rate_limit.delete();
                        return;
                    }
                }

                // Multi-unit marketplace-fulfilled orders are first split
                // into single-unit postings; ingestion happens on a later
                // poll once the split postings appear
                if command.delivery == DeliveryKind::FbsOzon && posting.total_quantity() > 1 {
                    let _ = self
                        .queue
                        .dispatch(
                            QueueMessage::SplitOrder(SplitOrderMessage {
                                profile: message.profile,
                                token: token.id,
                                order_number: posting.posting_number.clone(),
                            }),
                            None,
                            Lane::profile(message.profile),
                        )
                        .await;

                    tracing::info!(
                        posting = %posting.posting_number,
                        quantity = posting.total_quantity(),
                        "Dispatched order for pre-packaging split"
                    );
                    continue;
                }

                match self.handler.handle(&command).await {
                    Ok(NewOrderOutcome::Created) | Ok(NewOrderOutcome::AlreadyExists) => {
                        if let Err(e) = order_guard.save() {
                            tracing::error!(error = %e, "Failed to save order dedup record");
                        }
                    }
                    Ok(NewOrderOutcome::NotNew) => {}
                    Err(e) => {
                        // No dedup save: the next poll retries naturally
                        tracing::error!(
                            number = %command.number,
                            error = %e,
                            "Failed to create order"
                        );
                    }
                }
            }
        }

        // Release the rate limit; the TTL only matters for crashed runs
        if let Err(e) = rate_limit.delete() {
            tracing::error!(profile = %message.profile, error = %e, "Failed to release rate-limit record");
        }
    }
}
