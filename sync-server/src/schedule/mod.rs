//! Polling schedulers
//!
//! The marketplace has no push channel; new and cancelled postings are
//! discovered by periodic polls per seller profile. The planner worker
//! ticks on a fixed period and fans one poll message out per profile; the
//! poll handlers do the actual ingestion under a rate-limit guard.

pub mod cancel_orders;
pub mod new_orders;
pub mod window;

pub use cancel_orders::CancelOrdersDispatcher;
pub use new_orders::NewOrdersDispatcher;

use shared::message::{CancelOrdersPollMessage, Lane, NewOrdersPollMessage, QueueMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::queue::MessageDispatch;
use crate::services::TokenProvider;

/// Stagger between the tick and the dispatched polls, so a burst of
/// profiles does not hit the marketplace at the same instant
const POLL_FANOUT_DELAY: Duration = Duration::from_secs(15);

/// Timer worker that fans poll messages out per profile
pub struct SchedulePlanner {
    queue: Arc<dyn MessageDispatch>,
    tokens: Arc<dyn TokenProvider>,
    new_orders_period: Duration,
    cancel_period: Duration,
}

impl SchedulePlanner {
    pub fn new(
        queue: Arc<dyn MessageDispatch>,
        tokens: Arc<dyn TokenProvider>,
        new_orders_period: Duration,
        cancel_period: Duration,
    ) -> Self {
        Self {
            queue,
            tokens,
            new_orders_period,
            cancel_period,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            new_orders_secs = self.new_orders_period.as_secs(),
            cancel_secs = self.cancel_period.as_secs(),
            "Schedule planner started"
        );

        let mut new_orders_tick = tokio::time::interval(self.new_orders_period);
        let mut cancel_tick = tokio::time::interval(self.cancel_period);
        // Skip the immediate first tick of both timers
        new_orders_tick.tick().await;
        cancel_tick.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Schedule planner shutting down");
                    break;
                }

                _ = new_orders_tick.tick() => {
                    for profile in self.tokens.profiles() {
                        let _ = self.queue.dispatch(
                            QueueMessage::NewOrdersPoll(NewOrdersPollMessage {
                                profile,
                                interval_secs: None,
                            }),
                            Some(POLL_FANOUT_DELAY),
                            Lane::profile(profile),
                        ).await;
                    }
                }

                _ = cancel_tick.tick() => {
                    for profile in self.tokens.profiles() {
                        let _ = self.queue.dispatch(
                            QueueMessage::CancelOrdersPoll(CancelOrdersPollMessage {
                                profile,
                                interval_secs: None,
                            }),
                            Some(POLL_FANOUT_DELAY),
                            Lane::profile(profile),
                        ).await;
                    }
                }
            }
        }
    }
}
