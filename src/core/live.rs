//! Table of tasks that have started and not yet settled.
//!
//! Each entry remembers the epoch it was registered in. Registration and
//! settlement compare that epoch against the engine's under the table lock,
//! and shutdown advances the epoch before it takes the lock, so a task is
//! either drained by shutdown or handled by its own settlement, never both.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::fabric::Epoch;
use crate::fabric::best_effort::with_table;
use crate::tasks::{TaskId, TaskState};

pub(crate) struct LiveTask {
    pub(crate) state: Arc<TaskState>,
    pub(crate) epoch: u64,
}

/// What settlement found in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Removal {
    Removed,
    /// The engine closed since the task started; the entry belongs to shutdown.
    Stale,
    Missing,
}

#[derive(Default)]
pub(crate) struct LiveTasks {
    table: Mutex<HashMap<TaskId, LiveTask>>,
}

impl LiveTasks {
    /// Registers a task; fails on a duplicate id, an unusable table, or an
    /// epoch that moved since the task captured it.
    pub(crate) fn insert(&self, task: LiveTask, epoch: &Epoch) -> Result<(), String> {
        let id = task.state.id().clone();
        with_table(&self.table, "live_tasks", |t| {
            if epoch.is_stale(task.epoch) {
                return Err(format!("engine closed while task {id} was starting"));
            }
            if t.contains_key(&id) {
                return Err(format!("task {id} is already live"));
            }
            t.insert(id.clone(), task);
            Ok(())
        })
        .unwrap_or_else(|| Err("live task table unavailable".to_string()))
    }

    pub(crate) fn get(&self, task_id: &str) -> Option<Arc<TaskState>> {
        with_table(&self.table, "live_tasks", |t| t.get(task_id).map(|l| Arc::clone(&l.state))).flatten()
    }

    /// Removes a settling task unless the engine closed since `started_at`.
    pub(crate) fn remove_settled(&self, task_id: &str, epoch: &Epoch, started_at: u64) -> Removal {
        with_table(&self.table, "live_tasks", |t| {
            if epoch.is_stale(started_at) {
                Removal::Stale
            } else if t.remove(task_id).is_some() {
                Removal::Removed
            } else {
                Removal::Missing
            }
        })
        .unwrap_or(Removal::Missing)
    }

    /// Empties the table.
    ///
    /// Shutdown must see every live task, so a poisoned lock is recovered here
    /// instead of skipped.
    pub(crate) fn drain(&self) -> Vec<LiveTask> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.drain().map(|(_, task)| task).collect()
    }

    /// Live task ids, sorted.
    pub(crate) fn ids(&self) -> Vec<TaskId> {
        let mut ids = with_table(&self.table, "live_tasks", |t| t.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.table.lock();
            panic!("live table poisoned");
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn task(epoch: u64) -> LiveTask {
        LiveTask {
            state: Arc::new(TaskState::new(
                TaskId::generate(),
                "open the page".into(),
                None,
                CancellationToken::new(),
            )),
            epoch,
        }
    }

    #[test]
    fn insert_is_refused_once_the_epoch_moved() {
        let live = LiveTasks::default();
        let epoch = Epoch::new();
        let captured = epoch.current();
        epoch.advance();

        let err = live.insert(task(captured), &epoch).unwrap_err();
        assert!(err.contains("engine closed"));
        assert!(live.ids().is_empty());
        assert!(live.drain().is_empty());
    }

    #[test]
    fn stale_settlement_leaves_the_entry_to_shutdown() {
        let live = LiveTasks::default();
        let epoch = Epoch::new();
        let t = task(epoch.current());
        let id = t.state.id().clone();
        live.insert(t, &epoch).unwrap();

        epoch.advance();
        assert_eq!(live.remove_settled(id.as_str(), &epoch, 0), Removal::Stale);
        assert_eq!(live.drain().len(), 1);
    }

    #[test]
    fn settlement_removes_current_entries_once() {
        let live = LiveTasks::default();
        let epoch = Epoch::new();
        let t = task(epoch.current());
        let id = t.state.id().clone();
        live.insert(t, &epoch).unwrap();

        assert_eq!(live.remove_settled(id.as_str(), &epoch, 0), Removal::Removed);
        assert_eq!(live.remove_settled(id.as_str(), &epoch, 0), Removal::Missing);
    }

    #[test]
    fn poisoned_table_refuses_inserts() {
        let live = LiveTasks::default();
        live.poison();
        let epoch = Epoch::new();
        assert!(live.insert(task(0), &epoch).is_err());
        // Shutdown still recovers the table.
        assert!(live.drain().is_empty());
    }
}
