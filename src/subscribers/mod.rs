//! # Event subscribers.
//!
//! - [`Subscribe`]: the extension point for event handlers
//! - [`SubscriberSet`]: non-blocking fan-out with per-subscriber queues
//! - [`LogWriter`]: writes every event as a `tracing` record
//!
//! Subscribers are attached with
//! [`EngineBuilder::with_subscribers`](crate::EngineBuilder::with_subscribers).

mod log;
mod subscribe;
mod subscriber_set;

pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
