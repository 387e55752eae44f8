//! Packaging: splitting an order into physical shipment packages
//!
//! When an internal order reaches the packaging status under
//! marketplace-fulfilled delivery, the orchestrator computes how the
//! ordered quantities distribute over physical packages, submits the split
//! to the marketplace, persists the resulting posting numbers, and kicks
//! off label generation per posting.

pub mod package_order;
pub mod packing;
pub mod split_order;

pub use package_order::PackageOrderDispatcher;
pub use packing::{build_packages, pack, ProductPacking};
pub use split_order::SplitOrderDispatcher;
