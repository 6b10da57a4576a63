//! # LogWriter: events as `tracing` records
//!
//! A minimal subscriber that turns every [`Event`] into one structured log
//! line under the `taskpilot::events` target. Failures log at `warn`,
//! everything else at `info` or `debug`.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO taskpilot::events: task started task="4f1c..." status=running
//! WARN taskpilot::events: task failed task="4f1c..." reason="navigation timed out"
//! INFO taskpilot::events: server connected server="search"
//! INFO taskpilot::events: engine closed reason="drained 2"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event logging subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref();
        let server = e.server.as_deref();
        let reason = e.reason.as_deref();
        let status = e.status.map(|s| s.as_str());

        match e.kind {
            EventKind::TaskStarted => {
                tracing::info!(target: "taskpilot::events", task, status, "task started")
            }
            EventKind::TaskPaused => tracing::debug!(target: "taskpilot::events", task, "task paused"),
            EventKind::TaskResumed => tracing::debug!(target: "taskpilot::events", task, "task resumed"),
            EventKind::TaskCancelled => {
                tracing::info!(target: "taskpilot::events", task, reason, "task cancelled")
            }
            EventKind::TaskCompleted => {
                tracing::info!(target: "taskpilot::events", task, status, "task completed")
            }
            EventKind::TaskFailed => {
                tracing::warn!(target: "taskpilot::events", task, reason, "task failed")
            }
            EventKind::ServerConnected => {
                tracing::info!(target: "taskpilot::events", server, "server connected")
            }
            EventKind::ServerRejected => {
                tracing::warn!(target: "taskpilot::events", server, reason, "server rejected")
            }
            EventKind::ServerDisconnected => {
                tracing::info!(target: "taskpilot::events", server, "server disconnected")
            }
            EventKind::EngineClosed => {
                tracing::info!(target: "taskpilot::events", reason, "engine closed")
            }
            EventKind::BookkeepingFailed => {
                tracing::warn!(target: "taskpilot::events", table = reason, task, "bookkeeping skipped")
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(target: "taskpilot::events", subscriber = task, info = reason, "subscriber panicked")
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "taskpilot::events", subscriber = task, reason, "subscriber overflow")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
