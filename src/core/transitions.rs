//! Caller-driven status changes.
//!
//! Shared by [`TaskControls`](crate::TaskControls) and the id-based methods on
//! [`Engine`](crate::Engine). A transition that applies is reported on the
//! task's own channel and on the bus; one that doesn't returns the current
//! status untouched.

use crate::events::{Event, EventKind};
use crate::fabric::Fabric;
use crate::tasks::{CancelReason, TaskState, TaskStatus};

pub(crate) fn cancel(state: &TaskState, fabric: &Fabric) -> TaskStatus {
    match state.cancel(CancelReason::Caller) {
        Ok(status) => {
            announce(state, fabric, status, EventKind::TaskCancelled, Some("caller"));
            status
        }
        Err(current) => current,
    }
}

pub(crate) fn pause(state: &TaskState, fabric: &Fabric) -> TaskStatus {
    match state.pause() {
        Ok(status) => {
            announce(state, fabric, status, EventKind::TaskPaused, None);
            status
        }
        Err(current) => current,
    }
}

pub(crate) fn resume(state: &TaskState, fabric: &Fabric) -> TaskStatus {
    match state.resume() {
        Ok(status) => {
            announce(state, fabric, status, EventKind::TaskResumed, None);
            status
        }
        Err(current) => current,
    }
}

pub(crate) fn announce(
    state: &TaskState,
    fabric: &Fabric,
    status: TaskStatus,
    kind: EventKind,
    reason: Option<&'static str>,
) {
    let id = state.id().as_str();
    fabric.report_status(id, status);

    let ev = Event::new(kind).with_task(id).with_status(status);
    fabric.bus().publish(match reason {
        Some(r) => ev.with_reason(r),
        None => ev,
    });
}
