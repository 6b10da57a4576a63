//! Engine core: task orchestration, actor lifecycle and shutdown.
//!
//! The public entry point is [`Engine`], built with [`EngineBuilder`].
//!
//! Internal modules:
//! - [`engine`]: public API, task setup and id-based controls;
//! - [`runner`]: drives one task and settles it exactly once;
//! - [`shutdown`]: drains live tasks when the engine is closed;
//! - [`transitions`]: caller-driven status changes and their events;
//! - [`live`]: table of started, unsettled tasks;
//! - [`actor`]: the epoch-gated shared actor slot;
//! - [`variables`]: named values snapshotted into each task.

mod actor;
mod builder;
mod config;
mod engine;
mod live;
mod runner;
mod shutdown;
pub(crate) mod transitions;
mod variables;

pub use actor::{ActorHandle, ActorProvider};
pub use builder::EngineBuilder;
pub use config::EngineConfig;
pub use engine::Engine;
pub use variables::Variable;
