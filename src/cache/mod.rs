//! # Action cache: bounded per-task execution traces.
//!
//! - [`ActionCacheEntry`] / [`ActionCache`] - the immutable trace of one task
//! - [`ActionCacheStore`] - process-wide table with FIFO eviction
//! - [`ScriptSynthesizer`] - hook consuming a trace for replay/script output

mod entry;
mod script;
mod store;

pub use entry::{ActionCache, ActionCacheEntry};
pub use script::ScriptSynthesizer;
pub use store::{ActionCacheStore, CacheWriteError};
