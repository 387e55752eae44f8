//! Cancellation poll handler
//!
//! Discovers cancelled postings and transitions the matching internal
//! orders. Dedup is keyed on the full posting number — sibling postings of
//! one order cancel independently.

use chrono::{Local, Utc};
use ozon_api::types::{ListPostingsRequest, PostingStatus};
use ozon_api::OzonApi;
use shared::message::CancelOrdersPollMessage;
use std::sync::Arc;
use std::time::Duration;

use super::window;
use crate::dedup::Deduplicator;
use crate::orders::{CancelOrderHandler, CancelOutcome};
use crate::services::TokenProvider;

const DEDUP_NAMESPACE: &str = "ozon-orders";
const HANDLER_KEY: &str = "cancel-orders-schedule";

/// Suppress re-handling a cancelled posting for a day; after that the
/// terminal-state guard makes the retry a no-op anyway
const POSTING_DEDUP_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct CancelOrdersDispatcher {
    dedup: Deduplicator,
    api: Arc<dyn OzonApi>,
    tokens: Arc<dyn TokenProvider>,
    handler: Arc<CancelOrderHandler>,
    poll_period: Duration,
}

impl CancelOrdersDispatcher {
    pub fn new(
        dedup: Deduplicator,
        api: Arc<dyn OzonApi>,
        tokens: Arc<dyn TokenProvider>,
        handler: Arc<CancelOrderHandler>,
        poll_period: Duration,
    ) -> Self {
        Self {
            dedup,
            api,
            tokens,
            handler,
            poll_period,
        }
    }

    pub async fn handle(&self, message: &CancelOrdersPollMessage) {
        let rate_limit = self
            .dedup
            .clone()
            .namespace(DEDUP_NAMESPACE)
            .ttl(self.poll_period)
            .keys([message.profile.to_string().as_str(), HANDLER_KEY]);

        match rate_limit.is_executed() {
            Ok(true) => {
                tracing::debug!(profile = %message.profile, "Cancellation poll already running, skipping");
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(profile = %message.profile, error = %e, "Dedup store unavailable");
                return;
            }
        }

        if let Err(e) = rate_limit.save() {
            tracing::error!(profile = %message.profile, error = %e, "Failed to save rate-limit record");
            return;
        }

        let explicit = message.interval_secs.map(Duration::from_secs);
        let lookback = window::lookback(Local::now().naive_local(), explicit, window::CANCEL_DEFAULT);

        for token in self.tokens.tokens_for(message.profile) {
            let request = ListPostingsRequest {
                status: PostingStatus::Cancelled,
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
                        "Failed to list cancelled postings"
                    );
                    continue;
                }
            };

            for posting in &postings {
                let guard = self
                    .dedup
                    .clone()
                    .namespace(DEDUP_NAMESPACE)
                    .ttl(POSTING_DEDUP_TTL)
                    .keys([posting.posting_number.as_str(), HANDLER_KEY]);

                match guard.is_executed() {
                    Ok(true) => continue,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Dedup store unavailable");
                        continue;
                    }
                }

                let command = crate::orders::cancel_command(posting, message.profile);

                match self.handler.handle(&command) {
                    Ok(CancelOutcome::Cancelled) => {
                        tracing::info!(number = %command.number, "Cancelled order from marketplace report");
                    }
                    Ok(CancelOutcome::Flagged) => {
                        tracing::info!(number = %command.number, "Flagged order for manual review");
                    }
                    Ok(CancelOutcome::Skipped) => {}
                    Err(e) => {
                        tracing::error!(
                            number = %command.number,
                            error = %e,
                            "Failed to cancel order"
                        );
                        // No dedup save, the next poll retries
                        continue;
                    }
                }

                if let Err(e) = guard.save() {
                    tracing::error!(error = %e, "Failed to save cancellation dedup record");
                }
            }
        }

        if let Err(e) = rate_limit.delete() {
            tracing::error!(profile = %message.profile, error = %e, "Failed to release rate-limit record");
        }
    }
}
