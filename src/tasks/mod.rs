//! # Task data model and boundary contracts.
//!
//! - [`TaskState`] / [`TaskStatus`] - per-task state with sticky terminal statuses
//! - [`TaskParams`] - caller-supplied knobs
//! - [`TaskRunner`] / [`RunnerFn`] - the external runner contract
//! - [`TaskControls`] / [`ResultHandle`] - what callers hold while a task runs

mod controls;
mod params;
mod runner;
mod state;

pub use controls::{
    CANCELLED_OUTPUT, CLOSED_OUTPUT, ResultHandle, TaskControls, TaskOutcome, TaskResult,
};
pub use params::TaskParams;
pub use runner::{RunContext, RunnerFn, RunnerRef, TaskOutput, TaskRunner};
pub use state::{CancelReason, TaskId, TaskState, TaskStatus};
