//! Message dispatch
//!
//! The workflows communicate exclusively through messages. [`MessageDispatch`]
//! is the seam to the queue transport: production deployments plug a broker
//! here, the binary and the tests run the in-process [`MemoryQueue`].
//!
//! Delivery is at-least-once and unordered across keys; ordering within one
//! posting's label pipeline comes from explicit message chaining, never from
//! the queue.

pub mod memory;

pub use memory::{MemoryQueue, QueueRunner};

use async_trait::async_trait;
use shared::message::{Lane, QueueMessage};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Queue closed")]
    Closed,
}

/// Producer side of the queue
#[async_trait]
pub trait MessageDispatch: Send + Sync {
    /// Enqueue a message, optionally delayed, on the given lane
    async fn dispatch(
        &self,
        message: QueueMessage,
        delay: Option<Duration>,
        lane: Lane,
    ) -> Result<(), DispatchError>;
}

/// Consumer side: one handler routes every message kind
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: QueueMessage);
}
