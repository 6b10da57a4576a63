//! # Engine events.
//!
//! [`EventKind`] classifies what happened; [`Event`] carries the metadata
//! (task id, server id, reason, resulting status).
//!
//! ## Ordering guarantees
//! Each event gets a process-wide sequence number (`seq`) that increases
//! monotonically. Receivers use it to order events from different publishers.
//!
//! ## Example
//! ```rust
//! use taskpilot::{Event, EventKind, TaskStatus};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task("4f1c")
//!     .with_status(TaskStatus::Failed)
//!     .with_reason("navigation timed out");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.reason.as_deref(), Some("navigation timed out"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::tasks::TaskStatus;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Task lifecycle ===
    /// Task registered and handed to the runner.
    ///
    /// Sets `task`, `status` (`Running`).
    TaskStarted,

    /// Task paused by a caller.
    ///
    /// Sets `task`, `status`.
    TaskPaused,

    /// Task resumed by a caller.
    ///
    /// Sets `task`, `status`.
    TaskResumed,

    /// Task cancelled, either by a caller or by shutdown.
    ///
    /// Sets `task`, `status`, `reason` (`caller` or `shutdown`).
    TaskCancelled,

    /// Task settled successfully.
    ///
    /// Sets `task`, `status`.
    TaskCompleted,

    /// Task settled with a failure (runner rejection or failed outcome).
    ///
    /// Sets `task`, `status`, `reason` (normalized cause, if the runner rejected).
    TaskFailed,

    // === Tool servers ===
    /// Tool server connected and its actions registered.
    ///
    /// Sets `server`, `reason` (contributed action count).
    ServerConnected,

    /// Tool server's actions collided with the registry and were rolled back.
    ///
    /// Sets `server`, `reason` (the conflict).
    ServerRejected,

    /// Tool server disconnected and its actions removed.
    ///
    /// Sets `server`.
    ServerDisconnected,

    // === Engine ===
    /// Engine closed: epoch advanced, live tasks drained.
    ///
    /// Sets `reason` (number of drained tasks).
    EngineClosed,

    /// A best-effort bookkeeping step was skipped.
    ///
    /// Sets `task` (if any), `reason` (the table that failed).
    BookkeepingFailed,

    /// A subscriber panicked while handling an event.
    ///
    /// Sets `task` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// A subscriber queue was full or closed and an event was dropped for it.
    ///
    /// Sets `task` (subscriber name), `reason`.
    SubscriberOverflow,
}

/// Engine event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Monotonic process-wide sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Task id (or subscriber name for subscriber events).
    pub task: Option<Arc<str>>,
    /// Tool server id.
    pub server: Option<Arc<str>>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
    /// Task status after the event.
    pub status: Option<TaskStatus>,
}

impl Event {
    /// Creates a new event with the current timestamp and the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            server: None,
            reason: None,
            status: None,
        }
    }

    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    #[inline]
    pub fn with_server(mut self, server: impl Into<Arc<str>>) -> Self {
        self.server = Some(server.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Creates a subscriber overflow event.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// Creates a bookkeeping-skipped event.
    pub fn bookkeeping_failed(table: &'static str, task: Option<&str>) -> Self {
        let ev = Event::new(EventKind::BookkeepingFailed).with_reason(table);
        match task {
            Some(t) => ev.with_task(t),
            None => ev,
        }
    }
}
