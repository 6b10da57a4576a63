//! # Engine configuration.
//!
//! Provides [`EngineConfig`]: plain public fields, a `Default`, and accessors
//! that clamp sentinel values so call sites don't repeat the checks.
//!
//! Configs can be deserialized (missing fields take their defaults):
//! ```
//! use taskpilot::EngineConfig;
//!
//! let cfg: EngineConfig = serde_json::from_str(r#"{ "max_cache_entries": 50 }"#).unwrap();
//! assert_eq!(cfg.cache_capacity(), 50);
//! assert_eq!(cfg.bus_capacity, 1024);
//! ```

use serde::{Deserialize, Serialize};

use crate::actions::builtin;
use crate::fabric::diag::MIN_DIAGNOSTIC_LEN;

/// Global configuration for one engine instance.
///
/// ## Field semantics
/// - `max_cache_entries`: cached traces kept before FIFO eviction (min 1)
/// - `bus_capacity`: engine event ring buffer size (min 1)
/// - `task_channel_capacity`: per-task event ring buffer size (min 1)
/// - `max_diagnostic_len`: longest untrusted message kept in logs and task errors
/// - `reserved_actions`: action types only built-ins may hold
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_cache_entries: usize,
    pub bus_capacity: usize,
    pub task_channel_capacity: usize,
    pub max_diagnostic_len: usize,
    pub reserved_actions: Vec<String>,
}

impl EngineConfig {
    #[inline]
    pub fn cache_capacity(&self) -> usize {
        self.max_cache_entries.max(1)
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    #[inline]
    pub fn task_channel_capacity_clamped(&self) -> usize {
        self.task_channel_capacity.max(1)
    }

    #[inline]
    pub fn diagnostic_len(&self) -> usize {
        self.max_diagnostic_len.max(MIN_DIAGNOSTIC_LEN)
    }
}

impl Default for EngineConfig {
    /// - `max_cache_entries = 1000`
    /// - `bus_capacity = 1024`
    /// - `task_channel_capacity = 64`
    /// - `max_diagnostic_len = 500`
    /// - `reserved_actions = ["complete", "complete_with_output_schema"]`
    fn default() -> Self {
        Self {
            max_cache_entries: 1000,
            bus_capacity: 1024,
            task_channel_capacity: 64,
            max_diagnostic_len: 500,
            reserved_actions: builtin::RESERVED.iter().map(|s| s.to_string()).collect(),
        }
    }
}
