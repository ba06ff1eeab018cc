//! Console API abstraction
//!
//! Bridges script console output to the tracing system. The `runtime_type` and
//! `script` fields let the log formatter attribute each line to its script.

use tracing::{debug, error, info, warn};

/// Console API implementation
#[derive(Clone, Default)]
pub struct ConsoleApi;

impl ConsoleApi {
    pub fn new() -> Self {
        Self
    }

    /// Log an info message
    pub fn log(runtime_type: &str, script: &str, message: &str) {
        info!(runtime_type = runtime_type, script = script, "{}", message);
    }

    pub fn error(runtime_type: &str, script: &str, message: &str) {
        error!(runtime_type = runtime_type, script = script, "{}", message);
    }

    pub fn warn(runtime_type: &str, script: &str, message: &str) {
        warn!(runtime_type = runtime_type, script = script, "{}", message);
    }

    /// Alias for log
    pub fn info(runtime_type: &str, script: &str, message: &str) {
        Self::log(runtime_type, script, message);
    }

    pub fn debug(runtime_type: &str, script: &str, message: &str) {
        debug!(runtime_type = runtime_type, script = script, "{}", message);
    }

    /// Route a message by level name; unknown levels log at info
    pub fn emit(level: &str, runtime_type: &str, script: &str, message: &str) {
        match level {
            "error" => Self::error(runtime_type, script, message),
            "warn" => Self::warn(runtime_type, script, message),
            "debug" => Self::debug(runtime_type, script, message),
            _ => Self::log(runtime_type, script, message),
        }
    }
}
