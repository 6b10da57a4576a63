//! Per-task event channels.
//!
//! Every task gets its own broadcast channel, keyed by task id, so a caller can
//! follow one task's status changes and failures without filtering the
//! engine-wide bus. Dropping the sender on settlement closes the channel for
//! all receivers.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::error::TaskError;
use crate::fabric::best_effort::with_table;
use crate::tasks::TaskStatus;

/// Event delivered on a task's own channel.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// The task moved to a new status.
    Status(TaskStatus),
    /// The task's runner rejected.
    Error(TaskError),
}

/// Table of live per-task channels.
pub(crate) struct TaskChannels {
    senders: Mutex<HashMap<String, broadcast::Sender<TaskEvent>>>,
    capacity: usize,
}

impl TaskChannels {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Opens the channel for `task_id` and returns its first receiver.
    ///
    /// Fails if a channel already exists for that id or the table is unusable.
    pub(crate) fn open(&self, task_id: &str) -> Result<broadcast::Receiver<TaskEvent>, String> {
        let opened = with_table(&self.senders, "task_channels", |senders| {
            if senders.contains_key(task_id) {
                return Err(format!("listener already attached for {task_id}"));
            }
            let (tx, rx) = broadcast::channel(self.capacity);
            senders.insert(task_id.to_string(), tx);
            Ok(rx)
        });
        opened.unwrap_or_else(|| Err("listener table unavailable".to_string()))
    }

    /// Closes the channel for `task_id`. Returns `true` if one was open.
    pub(crate) fn close(&self, task_id: &str) -> bool {
        with_table(&self.senders, "task_channels", |senders| senders.remove(task_id).is_some())
            .unwrap_or(false)
    }

    /// Sends on the task's channel if it is still open.
    pub(crate) fn send(&self, task_id: &str, ev: TaskEvent) {
        let _ = with_table(&self.senders, "task_channels", |senders| {
            if let Some(tx) = senders.get(task_id) {
                let _ = tx.send(ev);
            }
        });
    }

    pub(crate) fn is_open(&self, task_id: &str) -> bool {
        with_table(&self.senders, "task_channels", |senders| senders.contains_key(task_id))
            .unwrap_or(false)
    }

    pub(crate) fn len(&self) -> usize {
        with_table(&self.senders, "task_channels", |senders| senders.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn close_ends_the_stream() {
        let channels = TaskChannels::new(8);
        let mut rx = channels.open("t1").unwrap();
        channels.send("t1", TaskEvent::Status(TaskStatus::Paused));
        assert!(channels.close("t1"));

        assert!(matches!(rx.recv().await, Ok(TaskEvent::Status(TaskStatus::Paused))));
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Closed)));
    }

    #[test]
    fn duplicate_open_is_rejected() {
        let channels = TaskChannels::new(8);
        let _rx = channels.open("t1").unwrap();
        assert!(channels.open("t1").is_err());
        assert_eq!(channels.len(), 1);
    }

    #[test]
    fn channels_are_isolated() {
        let channels = TaskChannels::new(8);
        let mut a = channels.open("a").unwrap();
        let mut b = channels.open("b").unwrap();
        channels.send("a", TaskEvent::Status(TaskStatus::Paused));
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_err());
    }
}
