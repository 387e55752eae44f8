//! Shared types for the Ozon order-sync workspace
//!
//! Common types used across the client and server crates: identifier
//! newtypes, internal order representations, and the queue message set.

pub mod ids;
pub mod message;
pub mod order;

// Re-exports
pub use ids::{OrderId, OrderProductId, ProfileId, TokenId};
pub use message::{Lane, QueueMessage};
pub use order::{DeliveryKind, OrderStatus};
