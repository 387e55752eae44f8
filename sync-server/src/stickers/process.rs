//! Label pipeline step C: cache-first serving with readability post-check
//!
//! Serves the sticker straight from cache when possible; on a miss the
//! direct label endpoint is tried under the per-key single-flight guard.
//! Bytes that fail the readability check are evicted and the whole pipeline
//! re-runs — a corrupt cached label must never reach a printer twice.

use ozon_api::error::{Outcome, OzonError};
use ozon_api::OzonApi;
use shared::message::{CreateLabelTaskMessage, FetchLabelMessage, Lane, QueueMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::cache::{StickerCache, STICKER_TTL};
use super::verify::{LabelRenderer, StickerVerifier};
use crate::queue::MessageDispatch;
use crate::services::TokenProvider;

const RETRY_DELAY: Duration = Duration::from_secs(5);
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(60);

pub struct FetchLabelDispatcher {
    queue: Arc<dyn MessageDispatch>,
    api: Arc<dyn OzonApi>,
    tokens: Arc<dyn TokenProvider>,
    cache: StickerCache,
    renderer: Arc<dyn LabelRenderer>,
    verifier: Arc<dyn StickerVerifier>,
}

impl FetchLabelDispatcher {
    pub fn new(
        queue: Arc<dyn MessageDispatch>,
        api: Arc<dyn OzonApi>,
        tokens: Arc<dyn TokenProvider>,
        cache: StickerCache,
        renderer: Arc<dyn LabelRenderer>,
        verifier: Arc<dyn StickerVerifier>,
    ) -> Self {
        Self {
            queue,
            api,
            tokens,
            cache,
            renderer,
            verifier,
        }
    }

    pub async fn handle(&self, message: &FetchLabelMessage) {
        let Some(token) = self.tokens.token(message.token) else {
            tracing::warn!(
                posting = %message.posting_number,
                token = %message.token,
                "Authorization token not found"
            );
            return;
        };

        let rate_limited = AtomicBool::new(false);
        let benign = AtomicBool::new(false);

        let result = self
            .cache
            .get_or_try_compute(&message.posting_number, STICKER_TTL, || async {
                match self
                    .api
                    .label_batch(&token.api, &[message.posting_number.clone()])
                    .await
                {
                    Ok(Outcome::Success(file)) => match self.renderer.rasterize(&file) {
                        Ok(png) => Some(png),
                        Err(e) => {
                            tracing::error!(
                                posting = %message.posting_number,
                                error = %e,
                                "Failed to rasterize label"
                            );
                            None
                        }
                    },
                    Ok(Outcome::Benign) => {
                        benign.store(true, Ordering::SeqCst);
                        None
                    }
                    Err(OzonError::RateLimited) => {
                        rate_limited.store(true, Ordering::SeqCst);
                        None
                    }
                    Err(e) => {
                        tracing::warn!(
                            posting = %message.posting_number,
                            error = %e,
                            "Failed to fetch label directly"
                        );
                        None
                    }
                }
            })
            .await;

        let bytes = match result {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                if benign.load(Ordering::SeqCst) {
                    // Posting has no label to fetch (cancelled order)
                    return;
                }

                let delay = if rate_limited.load(Ordering::SeqCst) {
                    RATE_LIMIT_DELAY
                } else {
                    RETRY_DELAY
                };
                let _ = self
                    .queue
                    .dispatch(
                        QueueMessage::FetchLabel(message.clone()),
                        Some(delay),
                        Lane::orders(),
                    )
                    .await;
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Sticker cache unavailable");
                return;
            }
        };

        if self.verifier.verify(&bytes) {
            tracing::info!(posting = %message.posting_number, "Sticker ready");
            return;
        }

        // Corrupt label: evict and restart the pipeline from task creation
        tracing::error!(
            posting = %message.posting_number,
            "Cached sticker failed the readability check, evicting and regenerating"
        );

        if let Err(e) = self.cache.delete(&message.posting_number) {
            tracing::error!(error = %e, "Failed to evict corrupt sticker");
        }

        let _ = self
            .queue
            .dispatch(
                QueueMessage::CreateLabelTask(CreateLabelTaskMessage {
                    token: message.token,
                    posting_number: message.posting_number.clone(),
                }),
                Some(RETRY_DELAY),
                Lane::orders(),
            )
            .await;
    }
}
