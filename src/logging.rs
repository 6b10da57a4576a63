//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The engine itself only emits `tracing` records; installing a subscriber is
//! left to the embedding application. [`init_logging`] is a convenience for
//! binaries and tests.
//!
//! Priority for determining the filter:
//! 1. explicit `level` argument (if provided)
//! 2. `TASKPILOT_LOG` environment variable (an `EnvFilter` directive, e.g. "debug" or "taskpilot=trace")
//! 3. default to `info`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Environment variable read by [`init_logging`].
pub const LOG_ENV: &str = "TASKPILOT_LOG";

/// Verbosity accepted by [`init_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Installs a global fmt subscriber writing to stderr.
///
/// Fails if the `TASKPILOT_LOG` directive is malformed or a global subscriber
/// is already installed.
pub fn init_logging(level: Option<LogLevel>) -> Result<()> {
    let filter = match level {
        Some(lvl) => EnvFilter::new(lvl.as_directive()),
        None => match std::env::var(LOG_ENV) {
            Ok(directive) => EnvFilter::try_new(directive.trim())
                .with_context(|| format!("invalid {LOG_ENV} directive"))?,
            Err(_) => EnvFilter::new("info"),
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("installing the global tracing subscriber")
}
