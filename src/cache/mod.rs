pub mod entry;
pub mod result_cache;

pub use entry::{Entry, Outcome};
pub use result_cache::{CacheUpdate, ResultCache};
