//! Per-task execution parameters.

use serde::{Deserialize, Serialize};

/// Optional knobs passed through to the task runner.
///
/// ## Example
/// ```rust
/// use taskpilot::TaskParams;
///
/// let params = TaskParams::default()
///     .with_max_steps(12)
///     .with_output_schema(serde_json::json!({"type": "object"}));
/// assert_eq!(params.max_steps, Some(12));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskParams {
    /// Shape the final output must follow; the runner is expected to finish
    /// through `complete_with_output_schema` when set.
    pub output_schema: Option<serde_json::Value>,
    /// Upper bound on runner steps (`None` = runner default).
    pub max_steps: Option<u32>,
    /// Ask the runner for verbose diagnostics.
    pub debug: bool,
}

impl TaskParams {
    pub fn with_output_schema(mut self, schema: serde_json::Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_max_steps(mut self, n: u32) -> Self {
        self.max_steps = Some(n);
        self
    }
}
