//! In-process queue transport
//!
//! Unbounded channel feeding a `DelayQueue`; delayed messages mature inside
//! the runner. Lanes are carried as metadata — the in-process runner has a
//! single consumer, so lane separation only matters to the external broker
//! transport.

use async_trait::async_trait;
use futures::future::poll_fn;
use shared::message::{Lane, QueueMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::time::DelayQueue;

use super::{DispatchError, MessageDispatch, MessageHandler};

/// One enqueued message
#[derive(Debug)]
struct Envelope {
    message: QueueMessage,
    delay: Option<Duration>,
    lane: Lane,
}

/// Producer handle, cheap to clone
#[derive(Clone)]
pub struct MemoryQueue {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl MemoryQueue {
    /// Create the queue and its runner
    pub fn channel() -> (Self, QueueRunner) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, QueueRunner { rx })
    }
}

#[async_trait]
impl MessageDispatch for MemoryQueue {
    async fn dispatch(
        &self,
        message: QueueMessage,
        delay: Option<Duration>,
        lane: Lane,
    ) -> Result<(), DispatchError> {
        tracing::debug!(
            kind = message.kind(),
            lane = %lane,
            delay_secs = delay.map(|d| d.as_secs()).unwrap_or(0),
            "Dispatching message"
        );

        self.tx
            .send(Envelope {
                message,
                delay,
                lane,
            })
            .map_err(|_| DispatchError::Closed)
    }
}

/// Consumer loop: matures delayed envelopes and hands them to the handler
pub struct QueueRunner {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl QueueRunner {
    /// Run until shutdown. Messages in flight when the channel closes are
    /// still delivered.
    pub async fn run(mut self, handler: Arc<dyn MessageHandler>, shutdown: CancellationToken) {
        tracing::info!("Queue runner started");

        enum Step {
            Received(Option<Envelope>),
            Matured(Option<Envelope>),
            Shutdown,
        }

        let mut delayed: DelayQueue<Envelope> = DelayQueue::new();
        let mut channel_open = true;

        loop {
            // All mutation of the delay queue happens outside the select so
            // the branch futures only ever borrow it once
            let step = {
                let has_delayed = !delayed.is_empty();
                let matured = poll_fn(|cx| delayed.poll_expired(cx));

                tokio::select! {
                    _ = shutdown.cancelled() => Step::Shutdown,
                    received = self.rx.recv(), if channel_open => Step::Received(received),
                    expired = matured, if has_delayed => Step::Matured(expired.map(|e| e.into_inner())),
                }
            };

            match step {
                Step::Shutdown => {
                    tracing::info!("Queue runner received shutdown signal");
                    break;
                }
                Step::Received(Some(envelope)) => {
                    let delay = envelope.delay.unwrap_or(Duration::ZERO);
                    delayed.insert(envelope, delay);
                }
                Step::Received(None) => {
                    channel_open = false;
                    if delayed.is_empty() {
                        break;
                    }
                }
                Step::Matured(Some(envelope)) => {
                    tracing::debug!(
                        kind = envelope.message.kind(),
                        lane = %envelope.lane,
                        "Delivering message"
                    );
                    handler.handle(envelope.message).await;

                    if !channel_open && delayed.is_empty() {
                        break;
                    }
                }
                Step::Matured(None) => {}
            }
        }

        tracing::info!("Queue runner stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::{CreateLabelTaskMessage, FetchLabelMessage};
    use shared::TokenId;
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl MessageHandler for Recording {
        async fn handle(&self, message: QueueMessage) {
            self.seen.lock().unwrap().push(message.kind());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_message_matures_after_immediate() {
        let (queue, runner) = MemoryQueue::channel();
        let handler = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let shutdown = CancellationToken::new();

        let run = tokio::spawn(runner.run(handler.clone(), shutdown.clone()));

        let token = TokenId::new();
        queue
            .dispatch(
                QueueMessage::CreateLabelTask(CreateLabelTaskMessage {
                    token,
                    posting_number: "1-1-1".into(),
                }),
                Some(Duration::from_secs(10)),
                Lane::orders(),
            )
            .await
            .unwrap();
        queue
            .dispatch(
                QueueMessage::FetchLabel(FetchLabelMessage {
                    token,
                    posting_number: "1-1-2".into(),
                }),
                None,
                Lane::orders(),
            )
            .await
            .unwrap();

        // Closing the producer lets the runner drain and stop
        drop(queue);
        run.await.unwrap();

        let seen = handler.seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["fetch_label", "create_label_task"]);
    }
}
