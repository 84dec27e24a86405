//! Sequential fetch coordination
//!
//! A caller-supplied [`Fetcher`] is driven by one worker task per
//! [`FetchCoordinator`], fed from a deduplicated FIFO queue.

pub mod coordinator;
pub mod fetcher;
pub mod types;
mod worker;

pub use coordinator::*;
pub use fetcher::*;
pub use types::{CoordinatorStatus, LoadOutcome, StatsSnapshot};
