//! Cached execution trace of one settled task.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::tasks::{TaskId, TaskStatus};

/// One executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCacheEntry {
    /// Position of the step within the task (0-based).
    pub step_index: u32,
    /// Natural-language instruction that produced the step.
    pub instruction: String,
    /// Identifier of the targeted element, if any.
    pub element_id: Option<String>,
    /// Method invoked on the element (`click`, `fill`, ...).
    pub method: Option<String>,
    /// Arguments passed to `method`.
    pub arguments: Vec<String>,
    /// Frame the element lives in.
    pub frame_index: Option<u32>,
    /// Locator path of the element.
    pub xpath: Option<String>,
    /// Action type tag (the registry `type`).
    pub action_type: String,
    /// Whether the step succeeded.
    pub success: bool,
    /// Outcome message.
    pub message: String,
}

impl ActionCacheEntry {
    pub fn new(step_index: u32, action_type: impl Into<String>) -> Self {
        Self {
            step_index,
            instruction: String::new(),
            element_id: None,
            method: None,
            arguments: Vec::new(),
            frame_index: None,
            xpath: None,
            action_type: action_type.into(),
            success: true,
            message: String::new(),
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Sets the element target: id, frame and locator path.
    pub fn with_element(mut self, element_id: impl Into<String>, frame_index: u32, xpath: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self.frame_index = Some(frame_index);
        self.xpath = Some(xpath.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>, arguments: Vec<String>) -> Self {
        self.method = Some(method.into());
        self.arguments = arguments;
        self
    }

    pub fn with_outcome(mut self, success: bool, message: impl Into<String>) -> Self {
        self.success = success;
        self.message = message.into();
        self
    }
}

/// Trace of one task, written once when the task settles and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCache {
    pub task_id: TaskId,
    pub created_at: SystemTime,
    pub status: TaskStatus,
    pub steps: Vec<ActionCacheEntry>,
}

impl ActionCache {
    pub fn new(task_id: TaskId, status: TaskStatus, steps: Vec<ActionCacheEntry>) -> Self {
        Self {
            task_id,
            created_at: SystemTime::now(),
            status,
            steps,
        }
    }
}
