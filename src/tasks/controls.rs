//! # Caller-side handles to a running task.
//!
//! [`TaskControls`] is returned by
//! [`Engine::execute_task_async`](crate::Engine::execute_task_async) right after
//! the task is handed to the runner. It exposes the live status, the control
//! operations, the per-task event source and the [`ResultHandle`].

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::core::transitions;
use crate::error::{EngineError, TaskError};
use crate::fabric::{Fabric, TaskEvent};
use crate::tasks::{TaskId, TaskState, TaskStatus};

/// Output returned when a cancelled task settles.
pub const CANCELLED_OUTPUT: &str = "Task was cancelled";
/// Output returned when a task is drained by [`Engine::close_agent`](crate::Engine::close_agent).
pub const CLOSED_OUTPUT: &str = "Task cancelled because agent was closed";

/// Final, immutable result of a task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub output: Option<String>,
}

/// What the result handle resolves to.
pub type TaskResult = Result<TaskOutcome, TaskError>;

/// Awaitable, cloneable result of one task.
#[derive(Clone)]
pub struct ResultHandle {
    task_id: TaskId,
    rx: watch::Receiver<Option<TaskResult>>,
}

impl ResultHandle {
    pub(crate) fn new(task_id: TaskId, rx: watch::Receiver<Option<TaskResult>>) -> Self {
        Self { task_id, rx }
    }

    /// Waits until the task settles.
    ///
    /// Runner rejections surface as [`EngineError::Task`]; a settlement path that
    /// vanished without publishing surfaces as [`EngineError::Abandoned`].
    pub async fn wait(mut self) -> Result<TaskOutcome, EngineError> {
        let settled = match self.rx.wait_for(Option::is_some).await {
            Ok(v) => v.clone(),
            Err(_) => None,
        };
        match settled {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(e)) => Err(EngineError::Task(e)),
            None => Err(EngineError::Abandoned {
                task_id: self.task_id.to_string(),
            }),
        }
    }

    /// The result, if the task already settled.
    pub fn try_get(&self) -> Option<TaskResult> {
        self.rx.borrow().clone()
    }
}

/// Handle returned for every started task.
pub struct TaskControls {
    state: Arc<TaskState>,
    fabric: Arc<Fabric>,
    /// Resolves once the task settles.
    pub result: ResultHandle,
    /// This task's own events; closes when the task settles or is drained.
    pub events: broadcast::Receiver<TaskEvent>,
}

impl std::fmt::Debug for TaskControls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskControls")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TaskControls {
    pub(crate) fn new(
        state: Arc<TaskState>,
        fabric: Arc<Fabric>,
        result: ResultHandle,
        events: broadcast::Receiver<TaskEvent>,
    ) -> Self {
        Self {
            state,
            fabric,
            result,
            events,
        }
    }

    pub fn id(&self) -> &TaskId {
        self.state.id()
    }

    pub fn status(&self) -> TaskStatus {
        self.state.status()
    }

    pub fn state(&self) -> &Arc<TaskState> {
        &self.state
    }

    /// Cancels the task unless it already settled; returns the resulting status.
    pub fn cancel(&self) -> TaskStatus {
        transitions::cancel(&self.state, &self.fabric)
    }

    /// RUNNING → PAUSED; returns the resulting status.
    pub fn pause(&self) -> TaskStatus {
        transitions::pause(&self.state, &self.fabric)
    }

    /// PAUSED → RUNNING; returns the resulting status.
    pub fn resume(&self) -> TaskStatus {
        transitions::resume(&self.state, &self.fabric)
    }

    /// Waits for settlement, consuming the controls.
    pub async fn wait(self) -> Result<TaskOutcome, EngineError> {
        self.result.wait().await
    }
}
