//! Script registry records
//!
//! Plain data shared by every runtime adapter: loaded scripts, widget bindings
//! and dispatch counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::event_queue::EventType;
use super::widget::WidgetType;

/// A loaded script unit; replaced wholesale when the same path is reloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInfo {
    pub path: String,
    pub source: String,
    pub loaded: bool,
}

/// Wiring between one widget id and one loaded script
///
/// Handler names are either bare (`"onClick"`) or namespaced
/// (`"loginButton.onClick"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetScriptBinding {
    pub script_path: String,
    pub handlers: HashMap<EventType, String>,
    /// Shapes the `self` API handed to handlers
    pub widget_type: WidgetType,
}

impl WidgetScriptBinding {
    pub fn new(script_path: impl Into<String>, widget_type: WidgetType) -> Self {
        Self {
            script_path: script_path.into(),
            handlers: HashMap::new(),
            widget_type,
        }
    }

    pub fn with_handler(mut self, event_type: EventType, handler: impl Into<String>) -> Self {
        self.handlers.insert(event_type, handler.into());
        self
    }

    pub fn handler(&self, event_type: EventType) -> Option<&str> {
        self.handlers.get(&event_type).map(String::as_str)
    }
}

/// Snapshot of dispatch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Events taken off the queue
    pub processed: u64,
    /// Handlers that ran to completion
    pub handled: u64,
    /// Events dropped as soft misses (no binding, no handler, unresolvable handler)
    pub dropped: u64,
    /// Handlers that threw or panicked
    pub failed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    processed: AtomicU64,
    handled: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handled(&self) {
        self.handled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Outcome counters are bumped before `processed`, so a reader that sees
    /// `processed == n` also sees the outcome of the n-th event
    pub(crate) fn snapshot(&self) -> EngineStats {
        let processed = self.processed.load(Ordering::SeqCst);
        EngineStats {
            processed,
            handled: self.handled.load(Ordering::SeqCst),
            dropped: self.dropped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}
