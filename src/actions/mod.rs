//! # Actions and the action registry.
//!
//! - [`Action`] - trait for named, validated operations; [`ActionFn`] closure-backed impl
//! - [`ParamSchema`] - parameter-structure validator
//! - [`ActionRegistry`] - the authoritative table with atomic registration and rollback
//! - [`builtin`] - actions every registry starts with

mod action;
mod action_fn;
pub mod builtin;
mod registry;
mod schema;

pub use action::{Action, ActionContext, ActionInstance, ActionOutcome, ActionRef};
pub use action_fn::ActionFn;
pub use registry::{ActionRegistry, ActionSet, BulkRejection, Origin};
pub use schema::{ParamKind, ParamSchema};
