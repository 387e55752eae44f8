//! Label pipeline step B: poll the task and fill the cache

use ozon_api::error::OzonError;
use ozon_api::types::LabelTaskStatus;
use ozon_api::OzonApi;
use shared::message::{Lane, PollLabelTaskMessage, QueueMessage};
use std::sync::Arc;
use std::time::Duration;

use super::cache::{StickerCache, STICKER_TTL};
use super::verify::LabelRenderer;
use crate::queue::MessageDispatch;
use crate::services::TokenProvider;

/// Delay before polling an unfinished task again. There is no retry cap —
/// a task that never completes surfaces through operational monitoring of
/// the warn logs.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(15);

const RATE_LIMIT_DELAY: Duration = Duration::from_secs(60);

pub struct LabelTaskDispatcher {
    queue: Arc<dyn MessageDispatch>,
    api: Arc<dyn OzonApi>,
    tokens: Arc<dyn TokenProvider>,
    cache: StickerCache,
    renderer: Arc<dyn LabelRenderer>,
}

impl LabelTaskDispatcher {
    pub fn new(
        queue: Arc<dyn MessageDispatch>,
        api: Arc<dyn OzonApi>,
        tokens: Arc<dyn TokenProvider>,
        cache: StickerCache,
        renderer: Arc<dyn LabelRenderer>,
    ) -> Self {
        Self {
            queue,
            api,
            tokens,
            cache,
            renderer,
        }
    }

    pub async fn handle(&self, message: &PollLabelTaskMessage) {
        // Another path may have filled the cache already
        match self.cache.get(&message.posting_number) {
            Ok(Some(_)) => {
                tracing::info!(posting = %message.posting_number, "Sticker already cached");
                return;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "Sticker cache unavailable");
                return;
            }
        }

        let Some(token) = self.tokens.token(message.token) else {
            tracing::warn!(
                posting = %message.posting_number,
                token = %message.token,
                "Authorization token not found"
            );
            return;
        };

        let status = match self.api.get_label_task(&token.api, message.task_id).await {
            Ok(status) => status,
            Err(OzonError::RateLimited) => {
                self.requeue(message, RATE_LIMIT_DELAY).await;
                return;
            }
            Err(e) => {
                tracing::warn!(
                    posting = %message.posting_number,
                    task = message.task_id,
                    error = %e,
                    "Failed to poll label task, retrying"
                );
                self.requeue(message, POLL_RETRY_DELAY).await;
                return;
            }
        };

        let file_url = match status {
            LabelTaskStatus::Completed { file_url } => file_url,
            LabelTaskStatus::Pending => {
                tracing::warn!(
                    posting = %message.posting_number,
                    task = message.task_id,
                    "Label not ready yet"
                );
                self.requeue(message, POLL_RETRY_DELAY).await;
                return;
            }
        };

        let file = match self.api.download(&file_url).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(
                    posting = %message.posting_number,
                    error = %e,
                    "Failed to download label file, retrying"
                );
                self.requeue(message, POLL_RETRY_DELAY).await;
                return;
            }
        };

        let png = match self.renderer.rasterize(&file) {
            Ok(png) => png,
            Err(e) => {
                tracing::error!(
                    posting = %message.posting_number,
                    error = %e,
                    "Failed to rasterize label"
                );
                return;
            }
        };

        if let Err(e) = self.cache.put(&message.posting_number, &png, STICKER_TTL) {
            tracing::error!(error = %e, "Failed to cache sticker");
            return;
        }

        tracing::info!(posting = %message.posting_number, "Cached shipment sticker");
    }

    async fn requeue(&self, message: &PollLabelTaskMessage, delay: Duration) {
        let _ = self
            .queue
            .dispatch(
                QueueMessage::PollLabelTask(message.clone()),
                Some(delay),
                Lane::orders(),
            )
            .await;
    }
}
