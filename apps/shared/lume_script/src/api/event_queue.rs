//! Event Queue
//!
//! Bounded inbox of UI-originated events flowing from the host loop (render/update
//! thread) into the script worker.
//!
//! # Backpressure
//!
//! `push` never blocks. When the inbox is full the event is dropped and `push`
//! returns `false`, so a slow or paused script engine can never stall the host loop.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use schemars::JsonSchema;

/// Default number of events the inbox can hold
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 100;

/// Kinds of interaction the host loop can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Click,
    Hover,
    MouseDown,
    MouseUp,
    Focus,
    Blur,
    Change,
    Submit,
    KeyPress,
}

impl EventType {
    /// All event kinds, in declaration order
    pub const ALL: [EventType; 9] = [
        EventType::Click,
        EventType::Hover,
        EventType::MouseDown,
        EventType::MouseUp,
        EventType::Focus,
        EventType::Blur,
        EventType::Change,
        EventType::Submit,
        EventType::KeyPress,
    ];

    /// Wire name used by scripts (`event.type`)
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Click => "click",
            EventType::Hover => "hover",
            EventType::MouseDown => "mousedown",
            EventType::MouseUp => "mouseup",
            EventType::Focus => "focus",
            EventType::Blur => "blur",
            EventType::Change => "change",
            EventType::Submit => "submit",
            EventType::KeyPress => "keypress",
        }
    }

    /// Conventional handler name for this kind (`onClick`, `onMouseDown`, ...)
    pub fn handler_name(&self) -> &'static str {
        match self {
            EventType::Click => "onClick",
            EventType::Hover => "onHover",
            EventType::MouseDown => "onMouseDown",
            EventType::MouseUp => "onMouseUp",
            EventType::Focus => "onFocus",
            EventType::Blur => "onBlur",
            EventType::Change => "onChange",
            EventType::Submit => "onSubmit",
            EventType::KeyPress => "onKeyPress",
        }
    }

    /// Whether the event carries pointer coordinates and a button index
    pub fn is_pointer(&self) -> bool {
        matches!(
            self,
            EventType::Click | EventType::MouseDown | EventType::MouseUp | EventType::Hover
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("Invalid event type: '{}'", s))
    }
}

/// One observed interaction
///
/// Immutable once constructed; consumed exactly once by the dispatch path.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetEvent {
    pub event_type: EventType,
    pub widget_id: String,
    /// Pointer X coordinate
    pub x: i32,
    /// Pointer Y coordinate
    pub y: i32,
    /// Mouse button (0 = left, 1 = middle, 2 = right)
    pub button: i32,
    pub timestamp: SystemTime,
    /// Kind-specific payload (e.g. `key`, `code` for key presses)
    pub data: HashMap<String, serde_json::Value>,
}

impl WidgetEvent {
    /// Create an event stamped with the current time
    pub fn new(event_type: EventType, widget_id: impl Into<String>) -> Self {
        Self {
            event_type,
            widget_id: widget_id.into(),
            x: 0,
            y: 0,
            button: 0,
            timestamp: SystemTime::now(),
            data: HashMap::new(),
        }
    }

    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_button(mut self, button: i32) -> Self {
        self.button = button;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Milliseconds since the Unix epoch, as exposed to scripts
    pub fn timestamp_millis(&self) -> u64 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Bounded, concurrency-safe event inbox (host loop -> script worker)
pub struct EventQueue {
    /// Dropped on `close()`, which disconnects the channel
    tx: Mutex<Option<Sender<WidgetEvent>>>,
    rx: Receiver<WidgetEvent>,
    capacity: usize,
}

impl EventQueue {
    /// Create a queue holding up to [`DEFAULT_EVENT_QUEUE_CAPACITY`] events
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_QUEUE_CAPACITY)
    }

    /// Create a queue with a custom bound
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
            capacity: capacity.max(1),
        }
    }

    /// Enqueue an event without blocking
    ///
    /// Returns `false` if the queue is full or closed; the event is dropped.
    pub fn push(&self, event: WidgetEvent) -> bool {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => match tx.try_send(event) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
            },
            None => false,
        }
    }

    /// Block until an event is available
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn pop(&self) -> Option<WidgetEvent> {
        self.rx.recv().ok()
    }

    /// Take the next event if one is queued
    pub fn try_pop(&self) -> Option<WidgetEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for an event
    pub fn pop_timeout(&self, timeout: Duration) -> Option<WidgetEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Close the queue; further pushes are rejected, queued events can still be popped
    pub fn close(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    /// Number of queued events (diagnostics only)
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn receiver(&self) -> &Receiver<WidgetEvent> {
        &self.rx
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
