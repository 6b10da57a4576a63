//! # Drain every live task on shutdown.
//!
//! ```text
//! epoch.advance()                       (results from earlier epochs go stale)
//!   └─► live.drain()
//!         └─► for each task:
//!               cancel(Shutdown) ─► report status, publish TaskCancelled
//!               unsubscribe listener
//!   └─► publish EngineClosed
//! ```
//!
//! ## Rules
//! - Runs synchronously: every drained task reads CANCELLED before the
//!   caller's next statement.
//! - Does not wait for runners; their late results are discarded when they settle.

use crate::core::live::LiveTasks;
use crate::core::transitions;
use crate::events::{Event, EventKind};
use crate::fabric::Fabric;
use crate::tasks::{CancelReason, TaskId};

/// Cancels and forgets every live task. Returns the drained ids.
pub(crate) fn drain(fabric: &Fabric, live: &LiveTasks) -> Vec<TaskId> {
    let epoch = fabric.epoch().advance();
    let drained = live.drain();
    let mut ids = Vec::with_capacity(drained.len());

    for task in drained {
        let id = task.state.id().clone();
        match task.state.cancel(CancelReason::Shutdown) {
            Ok(status) => {
                transitions::announce(&task.state, fabric, status, EventKind::TaskCancelled, Some("shutdown"))
            }
            Err(current) => {
                tracing::debug!(task = %id, status = %current, started_epoch = task.epoch, "drained task already settled")
            }
        }
        fabric.unsubscribe(id.as_str());
        ids.push(id);
    }

    tracing::info!(epoch, drained = ids.len(), "engine closed");
    fabric
        .bus()
        .publish(Event::new(EventKind::EngineClosed).with_reason(format!("drained {}", ids.len())));
    ids
}
