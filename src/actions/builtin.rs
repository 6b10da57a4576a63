//! Built-in actions seeded into every registry.
//!
//! `complete` and `complete_with_output_schema` end a task and are reserved:
//! custom and tool-server actions may never take these names.

use std::time::Duration;

use serde_json::Value;

use crate::actions::{ActionContext, ActionFn, ActionOutcome, ActionRef, ParamKind, ParamSchema};

pub const COMPLETE: &str = "complete";
pub const COMPLETE_WITH_OUTPUT_SCHEMA: &str = "complete_with_output_schema";
pub const WAIT: &str = "wait";

/// Names no custom or remote action may use.
pub const RESERVED: &[&str] = &[COMPLETE, COMPLETE_WITH_OUTPUT_SCHEMA];

/// Longest sleep the `wait` action honors.
const MAX_WAIT: Duration = Duration::from_secs(10);

/// The built-in action set.
pub fn builtin_actions() -> Vec<ActionRef> {
    vec![complete(), complete_with_output_schema(), wait()]
}

fn complete() -> ActionRef {
    ActionFn::new(COMPLETE, |_ctx: ActionContext, params: Value| async move {
        let success = params["success"].as_bool().unwrap_or(true);
        let text = params["text"].as_str().unwrap_or_default().to_string();
        if success {
            ActionOutcome::ok(text)
        } else {
            ActionOutcome::fail(text)
        }
    })
    .describe("Finish the task and report the final answer")
    .with_schema(
        ParamSchema::object()
            .required("success", ParamKind::Bool)
            .required("text", ParamKind::String),
    )
    .with_formatter(|p| format!("complete: {}", p["text"].as_str().unwrap_or_default()))
    .into_ref()
}

fn complete_with_output_schema() -> ActionRef {
    ActionFn::new(
        COMPLETE_WITH_OUTPUT_SCHEMA,
        |_ctx: ActionContext, params: Value| async move {
            let output = params["output"].clone();
            ActionOutcome::ok(output.to_string()).with_data(output)
        },
    )
    .describe("Finish the task with output matching the requested schema")
    .with_schema(ParamSchema::object().required("output", ParamKind::Any))
    .into_ref()
}

fn wait() -> ActionRef {
    ActionFn::new(WAIT, |ctx: ActionContext, params: Value| async move {
        let ms = params["duration_ms"].as_u64().unwrap_or(1_000);
        let dur = Duration::from_millis(ms).min(MAX_WAIT);
        tokio::select! {
            _ = tokio::time::sleep(dur) => ActionOutcome::ok(format!("waited {}ms", dur.as_millis())),
            _ = ctx.cancel.cancelled() => ActionOutcome::fail("wait interrupted: task cancelled"),
        }
    })
    .describe("Pause for a number of milliseconds (at most 10s)")
    .with_schema(ParamSchema::object().optional("duration_ms", ParamKind::Integer))
    .with_formatter(|p| format!("wait {}ms", p["duration_ms"].as_u64().unwrap_or(1_000)))
    .with_codegen(|p| format!("await sleep({});", p["duration_ms"].as_u64().unwrap_or(1_000)))
    .into_ref()
}
