//! Label pipeline
//!
//! Three chained asynchronous steps per posting:
//!
//! 1. [`CreateLabelTaskDispatcher`] asks the marketplace to generate the
//!    label (an opaque task id comes back),
//! 2. [`LabelTaskDispatcher`] polls the task, downloads the finished file,
//!    rasterizes it and fills the cache,
//! 3. [`FetchLabelDispatcher`] is the cache-first serving path with the
//!    readability post-check; a corrupt label is evicted and the pipeline
//!    re-runs.

pub mod cache;
pub mod create_task;
pub mod order_stickers;
pub mod poll_task;
pub mod process;
pub mod verify;

pub use cache::{StickerCache, STICKER_TTL};
pub use create_task::CreateLabelTaskDispatcher;
pub use order_stickers::OrderStickersDispatcher;
pub use poll_task::LabelTaskDispatcher;
pub use process::FetchLabelDispatcher;
pub use verify::{ImageVerifier, LabelRenderer, PngRenderer, RenderError, StickerVerifier};
