//! # Action abstraction.
//!
//! An [`Action`] is a named, parameter-validated operation the runner can
//! dispatch to the actor. The registry keys actions by [`Action::kind`]
//! (the action `type`).
//!
//! Bodies are supplied by built-ins, by the embedding application (custom
//! actions) or by remote tool servers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::core::{ActorHandle, Variable};
use crate::error::ActionError;
use crate::tasks::TaskId;

/// What an action body receives besides its parameters.
#[derive(Clone)]
pub struct ActionContext {
    pub task_id: TaskId,
    pub actor: ActorHandle,
    pub variables: Vec<Variable>,
    /// Fires when the owning task is cancelled.
    pub cancel: CancellationToken,
}

/// Result of one action invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    /// Structured data produced by the action (extractions, tool results).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ActionOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A concrete invocation chosen by the runner: action type plus parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInstance {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl ActionInstance {
    pub fn new(kind: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }
}

/// # Named, schema-validated operation.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use taskpilot::{Action, ActionContext, ActionOutcome};
///
/// struct Refresh;
///
/// #[async_trait]
/// impl Action for Refresh {
///     fn kind(&self) -> &str { "refresh_page" }
///
///     async fn run(&self, _ctx: ActionContext, _params: serde_json::Value) -> ActionOutcome {
///         ActionOutcome::ok("page refreshed")
///     }
/// }
/// ```
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// The unique action `type`.
    fn kind(&self) -> &str;

    /// One-line description for the runner's tool list.
    fn description(&self) -> &str {
        ""
    }

    /// Checks the parameter structure before `run`.
    fn validate(&self, _params: &serde_json::Value) -> Result<(), ActionError> {
        Ok(())
    }

    /// Executes the action against the actor.
    async fn run(&self, ctx: ActionContext, params: serde_json::Value) -> ActionOutcome;

    /// Human-readable rendering of an invocation.
    fn format(&self, _params: &serde_json::Value) -> Option<String> {
        None
    }

    /// Code/script snippet reproducing an invocation.
    fn generate_code(&self, _params: &serde_json::Value) -> Option<String> {
        None
    }
}

/// Shared handle to an action.
pub type ActionRef = Arc<dyn Action>;
