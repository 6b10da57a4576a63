//! # taskpilot
//!
//! **Taskpilot** is an orchestration engine that drives one shared, stateful
//! actor (typically a browser session) through natural-language tasks. Each
//! task is carried out by an external [`TaskRunner`] that picks actions from a
//! registry of built-in, custom and tool-server actions; the engine owns the
//! lifecycle around it.
//!
//! ## Architecture
//! ```text
//!   execute_task_async("book a table")          connect_to_mcp_server(cfg)
//!              │                                         │
//!              ▼                                         ▼
//! ┌──────────────────────────────────────┐   ┌─────────────────────────┐
//! │ Engine                               │   │ ToolServerManager       │
//! │ - ActorSlot (one live actor, epoch)  │   │ - ToolServerClient      │
//! │ - LiveTasks (started, unsettled)     │   │ - server id ─► actions  │
//! │ - Variables                          │   └───────────┬─────────────┘
//! └──────┬───────────────────────────────┘               │ register_bulk / remove
//!        │ snapshot                                       ▼
//!        │◄─────────────────────────────────── ActionRegistry (built-in, custom, server)
//!        ▼
//!   TaskRun::drive ──► TaskRunner::run(ctx) ──► TaskOutput { status, output, trace }
//!        │
//!        ├─► settle once (terminal status is sticky)
//!        ├─► ActionCacheStore (bounded FIFO of traces)
//!        └─► ResultHandle
//!
//!   every component ──► Fabric ──► per-task channel ──► TaskControls::events
//!                              └─► Bus ──► SubscriberSet ──► Subscribe::on_event
//! ```
//!
//! ### Task lifecycle
//! ```text
//! PENDING ──► RUNNING ◄──► PAUSED
//!               │            │
//!               ├──► COMPLETED
//!               ├──► FAILED
//!               └──► CANCELLED ◄── cancel() or close_agent()
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                         |
//! |-------------------|-----------------------------------------------------------|--------------------------------------------|
//! | **Engine**        | Run, control and drain tasks against a shared actor.      | [`Engine`], [`EngineBuilder`]              |
//! | **Runners**       | Plug in the component that actually performs a task.     | [`TaskRunner`], [`RunnerFn`]               |
//! | **Actions**       | Built-in, custom and tool-server actions in one registry. | [`Action`], [`ActionFn`], [`ActionRegistry`] |
//! | **Tool servers**  | Connect/disconnect servers, actions follow atomically.    | [`ToolServerClient`], [`McpConfig`]        |
//! | **Action cache**  | Bounded per-task traces for replay.                       | [`ActionCacheStore`], [`ScriptSynthesizer`] |
//! | **Events**        | Engine-wide bus and per-task channels.                    | [`Event`], [`Subscribe`], [`TaskEvent`]    |
//! | **Errors**        | Typed errors; rejections keep their original cause.       | [`EngineError`], [`TaskError`]             |
//!
//! ## Optional features
//! - `logging` (default): exports [`init_logging`], a `tracing-subscriber` fmt setup.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use taskpilot::{Engine, EngineConfig, Rejection, RunContext, RunnerFn, TaskOutput, TaskParams, TaskStatus};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = RunnerFn::arc(|ctx: RunContext| async move {
//!         Ok::<_, Rejection>(TaskOutput::completed(format!("done: {}", ctx.task.instruction())))
//!     });
//!
//!     let engine = Engine::builder(EngineConfig::default(), runner).build()?;
//!
//!     // No actor provider configured: hand the task an actor of our own.
//!     let actor: taskpilot::ActorHandle = Arc::new(());
//!     let outcome = engine.execute_task("open the inbox", TaskParams::default(), Some(actor)).await?;
//!
//!     assert_eq!(outcome.status, TaskStatus::Completed);
//!     assert_eq!(engine.get_action_cache(outcome.task_id.as_str()).map(|c| c.status), Some(TaskStatus::Completed));
//!     engine.close_agent().await;
//!     Ok(())
//! }
//! ```
pub mod actions;
pub mod cache;
mod core;
mod error;
pub mod events;
pub mod fabric;
pub mod mcp;
pub mod subscribers;
mod tasks;

#[cfg(feature = "logging")]
mod logging;

// ---- Public re-exports ----

pub use actions::{
    Action, ActionContext, ActionFn, ActionInstance, ActionOutcome, ActionRef, ActionRegistry,
    ActionSet, Origin, ParamKind, ParamSchema,
};
pub use cache::{ActionCache, ActionCacheEntry, ActionCacheStore, ScriptSynthesizer};
pub use crate::core::{ActorHandle, ActorProvider, Engine, EngineBuilder, EngineConfig, Variable};
pub use error::{ActionError, ConflictReason, EngineError, Rejection, TaskError, TransportError};
pub use events::{Bus, Event, EventKind};
pub use fabric::TaskEvent;
pub use mcp::{ClientFactory, Connection, McpConfig, ServerConfig, ServerInfo, ToolServerClient, TransportConfig};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{
    CANCELLED_OUTPUT, CLOSED_OUTPUT, CancelReason, ResultHandle, RunContext, RunnerFn, RunnerRef,
    TaskControls, TaskId, TaskOutcome, TaskOutput, TaskParams, TaskResult, TaskRunner, TaskState,
    TaskStatus,
};

#[cfg(feature = "logging")]
pub use logging::{LOG_ENV, LogLevel, init_logging};
