//! # External task runner contract.
//!
//! The engine does not know how a task is carried out (prompting, DOM
//! extraction, action selection). It hands a [`RunContext`] to a
//! [`TaskRunner`] and waits for a [`TaskOutput`] or a [`Rejection`].
//!
//! ## Contract
//! - `run` is called without any engine lock held; it may take as long as it likes.
//! - `run` may reject with any value (see [`Rejection`]); the engine normalizes it.
//! - Runners observe [`TaskState::status`] or [`TaskState::cancellation`] to stop
//!   early after a cancel. They do not have to: a late success after a cancel is
//!   discarded by the engine.
//! - `TaskOutput::trace` is written to the action cache once, in the order given.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::actions::{ActionContext, ActionSet};
use crate::cache::ActionCacheEntry;
use crate::core::{ActorHandle, Variable};
use crate::error::Rejection;
use crate::tasks::{TaskParams, TaskState, TaskStatus};

/// Everything a runner gets for one task.
#[derive(Clone)]
pub struct RunContext {
    /// Registry snapshot taken when the task started.
    pub actions: ActionSet,
    /// The task itself; status is live.
    pub task: Arc<TaskState>,
    /// Caller-supplied parameters.
    pub params: TaskParams,
    /// The shared actor.
    pub actor: ActorHandle,
    /// Variables snapshot taken when the task started.
    pub variables: Vec<Variable>,
}

impl RunContext {
    /// Context for dispatching one of `actions` on behalf of this task.
    pub fn action_context(&self) -> ActionContext {
        ActionContext {
            task_id: self.task.id().clone(),
            actor: self.actor.clone(),
            variables: self.variables.clone(),
            cancel: self.task.cancellation().clone(),
        }
    }
}

/// What a runner produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutput {
    /// `Completed` or `Failed` (a runner may also report `Cancelled`).
    pub status: TaskStatus,
    /// Final answer, if any.
    pub output: Option<String>,
    /// Executed steps, in execution order.
    pub trace: Vec<ActionCacheEntry>,
}

impl TaskOutput {
    pub fn completed(output: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Completed,
            output: Some(output.into()),
            trace: Vec::new(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed,
            output: Some(output.into()),
            trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<ActionCacheEntry>) -> Self {
        self.trace = trace;
        self
    }
}

/// # Drives one task to completion.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use taskpilot::{Rejection, RunContext, TaskOutput, TaskRunner};
///
/// struct Echo;
///
/// #[async_trait]
/// impl TaskRunner for Echo {
///     async fn run(&self, ctx: RunContext) -> Result<TaskOutput, Rejection> {
///         Ok(TaskOutput::completed(ctx.task.instruction()))
///     }
/// }
/// ```
#[async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    async fn run(&self, ctx: RunContext) -> Result<TaskOutput, Rejection>;
}

/// Shared handle to a runner.
pub type RunnerRef = Arc<dyn TaskRunner>;

/// Closure-backed runner.
///
/// Each call creates a fresh future; shared state goes in an `Arc` captured by the closure.
///
/// ```rust
/// use taskpilot::{Rejection, RunContext, RunnerFn, RunnerRef, TaskOutput};
///
/// let r: RunnerRef = RunnerFn::arc(|ctx: RunContext| async move {
///     Ok::<_, Rejection>(TaskOutput::completed(format!("did: {}", ctx.task.instruction())))
/// });
/// ```
pub struct RunnerFn<F> {
    f: F,
}

impl<F> RunnerFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }

    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> TaskRunner for RunnerFn<F>
where
    F: Fn(RunContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskOutput, Rejection>> + Send + 'static,
{
    async fn run(&self, ctx: RunContext) -> Result<TaskOutput, Rejection> {
        (self.f)(ctx).await
    }
}
