//! Label pipeline step A: create the generation task

use ozon_api::error::{Outcome, OzonError};
use ozon_api::OzonApi;
use shared::message::{CreateLabelTaskMessage, Lane, PollLabelTaskMessage, QueueMessage};
use std::sync::Arc;
use std::time::Duration;

use crate::queue::MessageDispatch;
use crate::services::TokenProvider;

/// Delay before the first poll of a fresh task
const POLL_DELAY: Duration = Duration::from_secs(5);

/// Retry delay for plain failures
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Back-off after a 429; the marketplace throttles label generation hard
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(60);

pub struct CreateLabelTaskDispatcher {
    queue: Arc<dyn MessageDispatch>,
    api: Arc<dyn OzonApi>,
    tokens: Arc<dyn TokenProvider>,
}

impl CreateLabelTaskDispatcher {
    pub fn new(
        queue: Arc<dyn MessageDispatch>,
        api: Arc<dyn OzonApi>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self { queue, api, tokens }
    }

    pub async fn handle(&self, message: &CreateLabelTaskMessage) {
        let Some(token) = self.tokens.token(message.token) else {
            tracing::warn!(
                posting = %message.posting_number,
                token = %message.token,
                "Authorization token not found"
            );
            return;
        };

        match self
            .api
            .create_label_task(&token.api, &message.posting_number)
            .await
        {
            Ok(Outcome::Success(task_id)) => {
                tracing::info!(
                    posting = %message.posting_number,
                    task = task_id,
                    "Created label generation task"
                );

                let _ = self
                    .queue
                    .dispatch(
                        QueueMessage::PollLabelTask(PollLabelTaskMessage {
                            token: message.token,
                            posting_number: message.posting_number.clone(),
                            task_id,
                        }),
                        Some(POLL_DELAY),
                        Lane::orders(),
                    )
                    .await;
            }
            Ok(Outcome::Benign) => {
                tracing::info!(
                    posting = %message.posting_number,
                    "No label to generate for posting"
                );
            }
            Err(OzonError::RateLimited) => {
                tracing::warn!(
                    posting = %message.posting_number,
                    "Label creation rate-limited, backing off"
                );
                self.requeue(message, RATE_LIMIT_DELAY).await;
            }
            Err(e) => {
                tracing::error!(
                    posting = %message.posting_number,
                    error = %e,
                    "Failed to create label task, retrying"
                );
                self.requeue(message, RETRY_DELAY).await;
            }
        }
    }

    async fn requeue(&self, message: &CreateLabelTaskMessage, delay: Duration) {
        let _ = self
            .queue
            .dispatch(
                QueueMessage::CreateLabelTask(message.clone()),
                Some(delay),
                Lane::orders(),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_tokens, FakeOzon, LabelCreateScript, RecordingDispatch};

    fn dispatcher(
        api: FakeOzon,
    ) -> (
        CreateLabelTaskDispatcher,
        Arc<RecordingDispatch>,
        CreateLabelTaskMessage,
    ) {
        let (tokens, _profile) = test_tokens();
        let token = tokens.token.id;
        let queue = Arc::new(RecordingDispatch::default());

        let dispatcher =
            CreateLabelTaskDispatcher::new(queue.clone(), Arc::new(api), tokens);

        let message = CreateLabelTaskMessage {
            token,
            posting_number: "1-1-1".to_string(),
        };

        (dispatcher, queue, message)
    }

    #[tokio::test]
    async fn test_success_chains_to_poll() {
        let (dispatcher, queue, message) = dispatcher(FakeOzon::default());

        dispatcher.handle(&message).await;

        let entries = queue.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.kind(), "poll_label_task");
        assert_eq!(entries[0].1, Some(POLL_DELAY));
    }

    #[tokio::test]
    async fn test_rate_limit_requeues_with_backoff() {
        let (dispatcher, queue, message) =
            dispatcher(FakeOzon::default().with_label_create(LabelCreateScript::RateLimited));

        dispatcher.handle(&message).await;

        let entries = queue.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.kind(), "create_label_task");
        assert_eq!(entries[0].1, Some(RATE_LIMIT_DELAY));
    }

    #[tokio::test]
    async fn test_benign_outcome_stops_the_chain() {
        let (dispatcher, queue, message) =
            dispatcher(FakeOzon::default().with_label_create(LabelCreateScript::Benign));

        dispatcher.handle(&message).await;
        assert!(queue.entries().is_empty());
    }
}
