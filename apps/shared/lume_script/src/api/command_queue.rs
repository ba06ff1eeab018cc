//! Command Queue
//!
//! Unbounded outbox of widget mutations requested by scripts. Scripts never
//! touch the widget tree; they enqueue [`WidgetCommand`]s which the host loop
//! drains with [`CommandQueue::pop_all`] and applies on its own thread.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::widget::Rgba;

/// Kinds of mutation a script can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    SetProperty,
    SetText,
    SetVisible,
    SetColor,
    Focus,
    Blur,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::SetProperty => "set_property",
            CommandType::SetText => "set_text",
            CommandType::SetVisible => "set_visible",
            CommandType::SetColor => "set_color",
            CommandType::Focus => "focus",
            CommandType::Blur => "blur",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque payload carried by a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CommandValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Color(Rgba),
    /// Objects and arrays passed to `setProperty`
    Json(serde_json::Value),
}

impl CommandValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CommandValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CommandValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CommandValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Rgba> {
        match self {
            CommandValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Lossy conversion to JSON, used when a host stores generic properties
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CommandValue::Null => serde_json::Value::Null,
            CommandValue::Bool(b) => serde_json::Value::Bool(*b),
            CommandValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CommandValue::Text(s) => serde_json::Value::String(s.clone()),
            CommandValue::Color(c) => serde_json::json!({ "r": c.r, "g": c.g, "b": c.b, "a": c.a }),
            CommandValue::Json(v) => v.clone(),
        }
    }
}

impl From<bool> for CommandValue {
    fn from(value: bool) -> Self {
        CommandValue::Bool(value)
    }
}

impl From<f64> for CommandValue {
    fn from(value: f64) -> Self {
        CommandValue::Number(value)
    }
}

impl From<String> for CommandValue {
    fn from(value: String) -> Self {
        CommandValue::Text(value)
    }
}

impl From<&str> for CommandValue {
    fn from(value: &str) -> Self {
        CommandValue::Text(value.to_string())
    }
}

impl From<Rgba> for CommandValue {
    fn from(value: Rgba) -> Self {
        CommandValue::Color(value)
    }
}

/// One mutation request, applied exactly once by the host loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetCommand {
    pub command_type: CommandType,
    pub widget_id: String,
    /// Property name, only meaningful for [`CommandType::SetProperty`]
    pub property: Option<String>,
    pub value: CommandValue,
}

impl WidgetCommand {
    pub fn new(command_type: CommandType, widget_id: impl Into<String>, value: CommandValue) -> Self {
        Self {
            command_type,
            widget_id: widget_id.into(),
            property: None,
            value,
        }
    }

    pub fn set_property(
        widget_id: impl Into<String>,
        property: impl Into<String>,
        value: CommandValue,
    ) -> Self {
        Self {
            command_type: CommandType::SetProperty,
            widget_id: widget_id.into(),
            property: Some(property.into()),
            value,
        }
    }
}

/// Unbounded, concurrency-safe command outbox (script worker -> host loop)
#[derive(Default)]
pub struct CommandQueue {
    commands: Mutex<Vec<WidgetCommand>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command; never blocks beyond the internal lock
    pub fn push(&self, command: WidgetCommand) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }

    /// Atomically take every queued command in insertion order
    pub fn pop_all(&self) -> Vec<WidgetCommand> {
        std::mem::take(&mut *self.commands.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Discard all queued commands
    pub fn clear(&self) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
