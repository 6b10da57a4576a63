//! Error types used by the taskpilot engine, its tasks and its transports.
//!
//! - [`EngineError`]: failures surfaced to callers of the engine API.
//! - [`TaskError`]: a task whose runner rejected; carries the task id and the original cause.
//! - [`TransportError`]: tool-server transport failures (never escape the server manager).
//! - [`ActionError`]: an action rejected its parameters.
//!
//! Every enum provides `as_label` (stable snake_case, for logs/metrics) and
//! `as_message` (human-readable details), mirroring each other across types.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::fabric::diag;

/// # Errors surfaced by the engine API.
///
/// Anything that affects what a caller asked for is returned as one of these.
/// Purely internal housekeeping never produces an `EngineError`; it degrades
/// to a log line instead.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// Blank instruction, blank/invalid id or invalid variable key.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong with the input.
        reason: String,
    },

    /// An action type is reserved or already present in the registry.
    #[error("action `{action}` cannot be registered: {reason}")]
    RegistrationConflict {
        /// The conflicting action type.
        action: String,
        /// `reserved` or `duplicate`.
        reason: ConflictReason,
    },

    /// The task could not be set up (listener subscription or state registration failed).
    #[error("task {task_id} could not be set up: {reason}")]
    TaskSetup {
        /// Id allocated for the task that was rolled back.
        task_id: String,
        /// Why setup failed.
        reason: String,
    },

    /// The task runner rejected.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// The shared actor could not be started (or its start raced a shutdown).
    #[error("actor unavailable: {reason}")]
    ActorUnavailable {
        /// Why the actor is not available.
        reason: String,
    },

    /// The result handle was dropped before the task settled.
    #[error("task {task_id} was dropped before it settled")]
    Abandoned {
        /// The task that never produced a result.
        task_id: String,
    },
}

impl EngineError {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskpilot::EngineError;
    ///
    /// let err = EngineError::InvalidInput { reason: "blank instruction".into() };
    /// assert_eq!(err.as_label(), "engine_invalid_input");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::InvalidInput { .. } => "engine_invalid_input",
            EngineError::RegistrationConflict { .. } => "engine_registration_conflict",
            EngineError::TaskSetup { .. } => "engine_task_setup",
            EngineError::Task(_) => "engine_task_failed",
            EngineError::ActorUnavailable { .. } => "engine_actor_unavailable",
            EngineError::Abandoned { .. } => "engine_task_abandoned",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EngineError::InvalidInput { reason } => format!("invalid input: {reason}"),
            EngineError::RegistrationConflict { action, reason } => {
                format!("conflict: action={action} reason={reason}")
            }
            EngineError::TaskSetup { task_id, reason } => {
                format!("setup failed: task={task_id} reason={reason}")
            }
            EngineError::Task(e) => e.as_message(),
            EngineError::ActorUnavailable { reason } => format!("actor unavailable: {reason}"),
            EngineError::Abandoned { task_id } => format!("abandoned: task={task_id}"),
        }
    }
}

/// Why an action type was refused by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// The type belongs to the closed reserved set.
    Reserved,
    /// The type is already present in the registry.
    Duplicate,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::Reserved => f.write_str("reserved"),
            ConflictReason::Duplicate => f.write_str("duplicate"),
        }
    }
}

/// # The value a task runner rejected with.
///
/// Runners may fail with a real error or with an arbitrary value. The engine
/// keeps the original and derives a deterministic string from it with
/// [`Rejection::normalize`].
#[derive(Debug)]
pub enum Rejection {
    /// A regular error.
    Error(Box<dyn std::error::Error + Send + Sync>),
    /// An arbitrary JSON-representable value.
    Value(serde_json::Value),
    /// The runner panicked; holds the panic payload if it was a string.
    Panic(String),
    /// Something that could not be represented at all.
    Opaque,
}

/// Fallback text for rejections that cannot be rendered.
pub const UNKNOWN_REJECTION: &str = "unknown error";

impl Rejection {
    /// Wraps any error type.
    pub fn error(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Rejection::Error(Box::new(e))
    }

    /// Wraps any serializable value; values that fail to serialize become [`Rejection::Opaque`].
    pub fn value<T: serde::Serialize>(v: &T) -> Self {
        match serde_json::to_value(v) {
            Ok(v) => Rejection::Value(v),
            Err(_) => Rejection::Opaque,
        }
    }

    /// Deterministic string form of the rejection.
    ///
    /// ```
    /// use taskpilot::Rejection;
    ///
    /// assert_eq!(Rejection::Value(serde_json::json!("boom")).normalize(), "boom");
    /// assert_eq!(Rejection::Value(serde_json::json!({"code": 7})).normalize(), r#"{"code":7}"#);
    /// assert_eq!(Rejection::Opaque.normalize(), "unknown error");
    /// ```
    pub fn normalize(&self) -> String {
        match self {
            Rejection::Error(e) => e.to_string(),
            Rejection::Value(serde_json::Value::String(s)) => s.clone(),
            Rejection::Value(v) => {
                serde_json::to_string(v).unwrap_or_else(|_| UNKNOWN_REJECTION.to_string())
            }
            Rejection::Panic(msg) => format!("runner panicked: {msg}"),
            Rejection::Opaque => UNKNOWN_REJECTION.to_string(),
        }
    }
}

impl From<anyhow::Error> for Rejection {
    fn from(e: anyhow::Error) -> Self {
        Rejection::Error(e.into())
    }
}

impl From<serde_json::Value> for Rejection {
    fn from(v: serde_json::Value) -> Self {
        Rejection::Value(v)
    }
}

/// # A task whose runner rejected.
///
/// Cheap to clone: the original cause is shared. It is delivered both on the
/// task's own event source and through the result handle.
#[derive(Error, Debug, Clone)]
#[error("task {task_id} failed: {message}")]
pub struct TaskError {
    /// The task that failed.
    pub task_id: String,
    /// Normalized, sanitized and length-bounded cause.
    pub message: String,
    cause: Arc<Rejection>,
}

impl TaskError {
    /// Builds a task error from the runner's rejection, bounding the message to `max_len` chars.
    pub fn from_rejection(task_id: impl Into<String>, cause: Rejection, max_len: usize) -> Self {
        let message = diag::sanitize(&cause.normalize(), max_len);
        Self {
            task_id: task_id.into(),
            message,
            cause: Arc::new(cause),
        }
    }

    /// The original rejection value.
    pub fn cause(&self) -> &Rejection {
        &self.cause
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match *self.cause {
            Rejection::Panic(_) => "task_panicked",
            _ => "task_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        format!("task={} error: {}", self.task_id, self.message)
    }
}

/// # Tool-server transport failures.
///
/// Produced by [`ToolServerClient`](crate::ToolServerClient) implementations.
/// The server manager catches, logs and reports them as `None`/`false`.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Connecting or handshaking with the server failed.
    #[error("connect failed: {0}")]
    Connect(String),
    /// Tearing down a connection failed.
    #[error("disconnect failed: {0}")]
    Disconnect(String),
    /// The transport could not be constructed from its configuration.
    #[error("transport construction failed: {0}")]
    Construct(String),
    /// The server id is not known to the transport.
    #[error("unknown server `{0}`")]
    UnknownServer(String),
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Connect(_) => "transport_connect",
            TransportError::Disconnect(_) => "transport_disconnect",
            TransportError::Construct(_) => "transport_construct",
            TransportError::UnknownServer(_) => "transport_unknown_server",
        }
    }
}

/// # Action parameter validation failures.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Parameters were not a JSON object.
    #[error("parameters must be an object")]
    NotAnObject,
    /// A required field is absent.
    #[error("missing required field `{0}`")]
    Missing(String),
    /// A field has the wrong JSON type.
    #[error("field `{field}` must be {expected}")]
    WrongType {
        /// Offending field.
        field: String,
        /// Expected JSON kind.
        expected: &'static str,
    },
    /// Any other action-specific rejection.
    #[error("{0}")]
    Invalid(String),
}
