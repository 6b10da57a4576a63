//! Engine events: data model and broadcast bus.
//!
//! The bus is the engine-wide (per engine instance) channel every component
//! reports into; per-task event sources live in [`fabric`](crate::fabric).
//!
//! ## Contents
//! - [`EventKind`], [`Event`] classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: task lifecycle (start, pause/resume, settle), the server
//!   manager (connect, rollback, disconnect), shutdown, best-effort bookkeeping.
//! - **Consumers**: the subscriber listener spawned by the engine builder
//!   (fans out to [`SubscriberSet`](crate::SubscriberSet)) and any caller of
//!   [`Engine::subscribe`](crate::Engine::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
