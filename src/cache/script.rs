//! Script/replay synthesis hook.
//!
//! Rendering a standalone reproduction from a trace lives outside the engine.
//! The engine only guarantees the steps it hands over are complete, ordered
//! and immutable.

use crate::cache::ActionCacheEntry;

/// Turns a cached step sequence into a standalone artifact.
pub trait ScriptSynthesizer: Send + Sync {
    fn synthesize(&self, steps: &[ActionCacheEntry], task_id: Option<&str>) -> String;
}

impl<F> ScriptSynthesizer for F
where
    F: Fn(&[ActionCacheEntry], Option<&str>) -> String + Send + Sync,
{
    fn synthesize(&self, steps: &[ActionCacheEntry], task_id: Option<&str>) -> String {
        self(steps, task_id)
    }
}
