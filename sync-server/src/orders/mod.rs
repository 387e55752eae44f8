//! Internal order projection
//!
//! The order aggregate proper lives in the order-management system; this
//! module keeps the projection the synchronization workflows need — one
//! record per marketplace order, its status, and the posting numbers
//! attached to each product line — plus the ingestion and cancellation
//! use-cases that mutate it.

pub mod cancel;
pub mod new_order;
pub mod store;
pub mod translate;

pub use cancel::{CancelOrderHandler, CancelOutcome};
pub use new_order::{NewOrderHandler, NewOrderOutcome};
pub use store::{
    CreateOutcome, NewOrderCommand, NewOrderProduct, OrderProductRecord, OrderRecord, OrderStore,
    OrderStoreError,
};
pub use translate::{cancel_command, new_order_command, CancelOrderCommand};
