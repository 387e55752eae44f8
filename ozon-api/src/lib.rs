//! Ozon Seller API client
//!
//! Stateless, token-scoped wrappers over the marketplace REST API. Every
//! call takes the authorization token explicitly; there is no hidden
//! per-request state. Recoverable marketplace outcomes ("already shipped",
//! "already cancelled", ...) are surfaced as [`Outcome::Benign`] rather than
//! errors, because callers must treat them as success-equivalent.
//!
//! # Module structure
//!
//! ```text
//! ozon-api/src/
//! ├── api.rs      # OzonApi trait (seam for fakes in tests)
//! ├── client.rs   # reqwest transport, auth headers, execution guard
//! ├── error.rs    # OzonError, Outcome, domain error codes
//! ├── labels.rs   # label task create/poll, direct label download
//! ├── orders.rs   # posting list/detail, ship, status transitions
//! └── types.rs    # wire DTOs (postings, ship result, label tasks)
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod labels;
pub mod orders;
pub mod types;

// Re-exports
pub use api::OzonApi;
pub use client::{ApiToken, OzonClient};
pub use error::{Outcome, OzonError};
pub use types::{
    ExemplarState, LabelTaskStatus, ListPostingsRequest, Package, PackageProduct, Posting,
    PostingProduct, PostingStatus, ShipRequest, ShipResult,
};
