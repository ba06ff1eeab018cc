use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_EVENT_QUEUE_CAPACITY;

/// Configuration for the JavaScript script engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ScriptEngineConfig {
    /// Install `console.*` output; when false the methods exist but do nothing
    pub enable_console: bool,

    /// QuickJS stack limit in bytes
    pub max_stack_size: usize,

    /// QuickJS heap limit in bytes (0 = unlimited)
    pub memory_limit: usize,

    /// Bound used by hosts when creating the event queue
    pub event_queue_capacity: usize,

    /// Name given to the script worker thread
    pub worker_thread_name: String,
}

impl Default for ScriptEngineConfig {
    fn default() -> Self {
        Self {
            enable_console: true,
            max_stack_size: default_max_stack_size(),
            memory_limit: 0,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            worker_thread_name: default_worker_thread_name(),
        }
    }
}

fn default_max_stack_size() -> usize {
    512 * 1024
}

fn default_worker_thread_name() -> String {
    "lume-script".to_string()
}

impl ScriptEngineConfig {
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.enable_console = enabled;
        self
    }

    pub fn with_max_stack_size(mut self, bytes: usize) -> Self {
        self.max_stack_size = bytes;
        self
    }

    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScriptEngineConfig::default();
        assert!(config.enable_console);
        assert_eq!(config.max_stack_size, 512 * 1024);
        assert_eq!(config.memory_limit, 0);
        assert_eq!(config.event_queue_capacity, 100);
        assert_eq!(config.worker_thread_name, "lume-script");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ScriptEngineConfig =
            serde_json::from_str(r#"{"enable_console": false, "event_queue_capacity": 8}"#).unwrap();
        assert!(!config.enable_console);
        assert_eq!(config.event_queue_capacity, 8);
        assert_eq!(config.max_stack_size, default_max_stack_size());
    }
}
