//! Ozon order synchronization service
//!
//! Polls the marketplace for new and cancelled postings, mirrors them into
//! the internal order store, orchestrates the packaging split when an order
//! reaches the packaging status, and fetches/caches printable shipment
//! labels through the asynchronous label pipeline.
//!
//! # Module structure
//!
//! ```text
//! sync-server/src/
//! ├── core/          # configuration, shared state, background tasks
//! ├── bus.rs         # operator event broadcast
//! ├── dedup/         # idempotence guard over redb
//! ├── queue/         # message dispatch trait + in-process transport
//! ├── orders/        # order projection store, translator, use-cases
//! ├── schedule/      # polling schedulers (new orders, cancellations)
//! ├── packaging/     # bin-packing and the packaging orchestrator
//! ├── stickers/      # label pipeline (task create/poll, cache, verify)
//! ├── status/        # DBS status propagation back to the marketplace
//! ├── services/      # token, catalog, geo collaborators
//! └── dispatch.rs    # message router
//! ```

pub mod bus;
pub mod core;
pub mod dedup;
pub mod dispatch;
pub mod orders;
pub mod packaging;
pub mod queue;
pub mod schedule;
pub mod services;
pub mod status;
pub mod stickers;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export public entry points
pub use crate::bus::{EventBus, OperatorEvent};
pub use crate::core::{AppState, BackgroundTasks, Config, TaskKind};
pub use crate::dedup::Deduplicator;
pub use crate::dispatch::Dispatchers;
pub use crate::queue::{MemoryQueue, MessageDispatch, QueueRunner};
