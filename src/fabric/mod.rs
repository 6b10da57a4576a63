//! # Shared lifecycle and error fabric.
//!
//! One [`Fabric`] exists per engine instance. It ties together:
//! - the engine-wide [`Bus`] every component reports into,
//! - the per-task channels behind [`TaskControls::events`](crate::TaskControls),
//! - the [`Epoch`] counter used to invalidate work that raced a shutdown.
//!
//! ```text
//!   runner rejects ──► Fabric::report_error(task_error)
//!                          ├──► task channel "t1" ──► TaskControls.events (t1 only)
//!                          └──► Bus (TaskFailed) ──► subscribers / Engine::subscribe()
//! ```
//!
//! The helpers in [`best_effort`] and [`diag`] are used by every component
//! that mutates internal tables or logs untrusted strings.

pub mod best_effort;
pub mod diag;
mod epoch;
mod task_channel;

pub use epoch::Epoch;
pub use task_channel::TaskEvent;

use tokio::sync::broadcast;

use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::TaskStatus;
use task_channel::TaskChannels;

/// Per-engine error channel, per-task subscriptions and epoch.
pub struct Fabric {
    bus: Bus,
    channels: TaskChannels,
    epoch: Epoch,
}

impl Fabric {
    pub fn new(bus: Bus, task_channel_capacity: usize) -> Self {
        Self {
            bus,
            channels: TaskChannels::new(task_channel_capacity),
            epoch: Epoch::new(),
        }
    }

    #[inline]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    #[inline]
    pub fn epoch(&self) -> &Epoch {
        &self.epoch
    }

    /// Attaches the isolated listener for a task.
    pub(crate) fn subscribe(&self, task_id: &str) -> Result<broadcast::Receiver<TaskEvent>, String> {
        self.channels.open(task_id)
    }

    /// Detaches the task's listener; a missing listener is logged, never raised.
    pub(crate) fn unsubscribe(&self, task_id: &str) {
        if !self.channels.close(task_id) {
            tracing::debug!(task = task_id, "no listener to detach");
        }
    }

    /// True while the task's listener is attached.
    pub fn is_subscribed(&self, task_id: &str) -> bool {
        self.channels.is_open(task_id)
    }

    /// Number of attached task listeners.
    pub fn subscriptions(&self) -> usize {
        self.channels.len()
    }

    /// Reports a status change on the task's channel.
    pub(crate) fn report_status(&self, task_id: &str, status: TaskStatus) {
        self.channels.send(task_id, TaskEvent::Status(status));
    }

    /// Reports a task failure on the task's channel and forwards it to the bus.
    pub(crate) fn report_error(&self, err: &TaskError) {
        self.channels.send(&err.task_id, TaskEvent::Error(err.clone()));
        self.bus.publish(
            Event::new(EventKind::TaskFailed)
                .with_task(err.task_id.as_str())
                .with_status(TaskStatus::Failed)
                .with_reason(err.message.as_str()),
        );
    }

    /// Records a skipped bookkeeping step.
    pub(crate) fn report_bookkeeping(&self, table: &'static str, task_id: Option<&str>) {
        tracing::warn!(table, task = task_id, "bookkeeping step skipped");
        self.bus.publish(Event::bookkeeping_failed(table, task_id));
    }
}
