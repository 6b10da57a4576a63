//! # Task state and the sticky status machine.
//!
//! ```text
//! PENDING ──► RUNNING ──► COMPLETED
//!               │  ▲  ──► FAILED
//!               ▼  │  ──► CANCELLED
//!              PAUSED ──► CANCELLED
//! ```
//!
//! ## Rules
//! - COMPLETED, FAILED and CANCELLED are terminal: once stored, no transition
//!   ever overwrites them. Every write goes through a compare-and-swap loop
//!   that refuses to leave a terminal value.
//! - Concurrent cancel + settle is therefore safe: whichever CAS lands first
//!   wins, the loser observes the terminal value and backs off.

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Opaque task identifier, unique for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Allocates a fresh id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal statuses are sticky.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Paused => "paused",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who cancelled a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// `cancel()` was called on the task or the engine.
    Caller,
    /// The engine was closed while the task was in flight.
    Shutdown,
}

// Raw encoding. Both cancelled variants read back as `TaskStatus::Cancelled`.
const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const PAUSED: u8 = 2;
const COMPLETED: u8 = 3;
const FAILED: u8 = 4;
const CANCELLED: u8 = 5;
const CANCELLED_SHUTDOWN: u8 = 6;

fn encode(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Pending => PENDING,
        TaskStatus::Running => RUNNING,
        TaskStatus::Paused => PAUSED,
        TaskStatus::Completed => COMPLETED,
        TaskStatus::Failed => FAILED,
        TaskStatus::Cancelled => CANCELLED,
    }
}

fn decode(raw: u8) -> TaskStatus {
    match raw {
        PENDING => TaskStatus::Pending,
        RUNNING => TaskStatus::Running,
        PAUSED => TaskStatus::Paused,
        COMPLETED => TaskStatus::Completed,
        CANCELLED | CANCELLED_SHUTDOWN => TaskStatus::Cancelled,
        // FAILED, and anything unreadable.
        _ => TaskStatus::Failed,
    }
}

/// Atomic status with terminal stickiness.
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) fn new(status: TaskStatus) -> Self {
        Self(AtomicU8::new(encode(status)))
    }

    #[inline]
    pub(crate) fn get(&self) -> TaskStatus {
        decode(self.0.load(Ordering::Acquire))
    }

    fn raw(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    /// Moves to the raw value chosen by `next` unless the current status is terminal.
    ///
    /// `Ok(new)` on success; `Err(current)` if the current status is terminal or
    /// `next` declined the transition.
    fn transition(&self, next: impl Fn(TaskStatus) -> Option<u8>) -> Result<TaskStatus, TaskStatus> {
        let mut cur = self.raw();
        loop {
            let status = decode(cur);
            if status.is_terminal() {
                return Err(status);
            }
            let Some(target) = next(status) else {
                return Err(status);
            };
            match self
                .0
                .compare_exchange(cur, target, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(decode(target)),
                Err(actual) => cur = actual,
            }
        }
    }
}

/// State of one task, shared between the engine, its controls and the runner.
#[derive(Debug)]
pub struct TaskState {
    id: TaskId,
    instruction: String,
    output_schema: Option<serde_json::Value>,
    status: StatusCell,
    created_at: SystemTime,
    token: CancellationToken,
}

impl TaskState {
    pub(crate) fn new(
        id: TaskId,
        instruction: String,
        output_schema: Option<serde_json::Value>,
        token: CancellationToken,
    ) -> Self {
        Self {
            id,
            instruction,
            output_schema,
            status: StatusCell::new(TaskStatus::Pending),
            created_at: SystemTime::now(),
            token,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn output_schema(&self) -> Option<&serde_json::Value> {
        self.output_schema.as_ref()
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Current status.
    pub fn status(&self) -> TaskStatus {
        self.status.get()
    }

    /// Cancellation token for cooperative runners.
    ///
    /// Cancelled together with the status flip; the engine never interrupts a
    /// runner by itself.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.token
    }

    /// Why the task was cancelled, if it was.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self.status.raw() {
            CANCELLED => Some(CancelReason::Caller),
            CANCELLED_SHUTDOWN => Some(CancelReason::Shutdown),
            _ => None,
        }
    }

    /// PENDING → RUNNING.
    pub(crate) fn start(&self) -> Result<TaskStatus, TaskStatus> {
        self.status
            .transition(|s| (s == TaskStatus::Pending).then_some(RUNNING))
    }

    pub(crate) fn pause(&self) -> Result<TaskStatus, TaskStatus> {
        self.status
            .transition(|s| (s == TaskStatus::Running).then_some(PAUSED))
    }

    pub(crate) fn resume(&self) -> Result<TaskStatus, TaskStatus> {
        self.status
            .transition(|s| (s == TaskStatus::Paused).then_some(RUNNING))
    }

    /// Any non-terminal status → CANCELLED.
    pub(crate) fn cancel(&self, reason: CancelReason) -> Result<TaskStatus, TaskStatus> {
        let raw = match reason {
            CancelReason::Caller => CANCELLED,
            CancelReason::Shutdown => CANCELLED_SHUTDOWN,
        };
        let res = self.status.transition(|_| Some(raw));
        if res.is_ok() {
            self.token.cancel();
        }
        res
    }

    /// Any non-terminal status → `terminal`.
    pub(crate) fn settle(&self, terminal: TaskStatus) -> Result<TaskStatus, TaskStatus> {
        debug_assert!(terminal.is_terminal());
        if terminal == TaskStatus::Cancelled {
            return self.cancel(CancelReason::Caller);
        }
        self.status.transition(|_| Some(encode(terminal)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state() -> TaskState {
        TaskState::new(TaskId::generate(), "t".into(), None, CancellationToken::new())
    }

    #[test]
    fn pause_resume_loop() {
        let s = state();
        assert_eq!(s.start(), Ok(TaskStatus::Running));
        assert_eq!(s.pause(), Ok(TaskStatus::Paused));
        assert_eq!(s.pause(), Err(TaskStatus::Paused));
        assert_eq!(s.resume(), Ok(TaskStatus::Running));
    }

    #[test]
    fn cancel_fires_token_once() {
        let s = state();
        s.start().unwrap();
        assert_eq!(s.cancel(CancelReason::Caller), Ok(TaskStatus::Cancelled));
        assert!(s.cancellation().is_cancelled());
        assert_eq!(s.cancel(CancelReason::Shutdown), Err(TaskStatus::Cancelled));
        assert_eq!(s.cancel_reason(), Some(CancelReason::Caller));
    }

    #[test]
    fn shutdown_reason_is_recorded() {
        let s = state();
        s.start().unwrap();
        s.pause().unwrap();
        s.cancel(CancelReason::Shutdown).unwrap();
        assert_eq!(s.status(), TaskStatus::Cancelled);
        assert_eq!(s.cancel_reason(), Some(CancelReason::Shutdown));
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Start,
        Pause,
        Resume,
        Cancel,
        Complete,
        Fail,
    }

    fn apply(s: &TaskState, op: Op) {
        let _ = match op {
            Op::Start => s.start(),
            Op::Pause => s.pause(),
            Op::Resume => s.resume(),
            Op::Cancel => s.cancel(CancelReason::Caller),
            Op::Complete => s.settle(TaskStatus::Completed),
            Op::Fail => s.settle(TaskStatus::Failed),
        };
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Start),
            Just(Op::Pause),
            Just(Op::Resume),
            Just(Op::Cancel),
            Just(Op::Complete),
            Just(Op::Fail),
        ]
    }

    proptest! {
        #[test]
        fn terminal_status_never_changes(ops in proptest::collection::vec(op(), 1..40)) {
            let s = state();
            let mut settled: Option<TaskStatus> = None;
            for op in ops {
                apply(&s, op);
                let now = s.status();
                if let Some(prev) = settled {
                    prop_assert_eq!(prev, now);
                } else if now.is_terminal() {
                    settled = Some(now);
                }
            }
        }
    }
}
