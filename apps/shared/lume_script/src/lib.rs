//! Lume Script Engine
//!
//! Connects user scripts to a live widget tree owned by a host loop.
//!
//! # Architecture
//!
//! - **EventQueue**: bounded inbox of widget events, host loop -> script worker
//! - **CommandQueue**: outbox of widget mutations, script worker -> host loop
//! - **UiTree**: hierarchical index over the host's flat widget list
//! - **ScriptEngine**: owns one script context, dispatches events to bound handlers
//!   on a dedicated worker thread and projects the UI tree as `RootElement`
//!
//! Scripts never touch widgets directly. Every mutation is a queued
//! [`WidgetCommand`] that the host applies on its own thread.

pub mod api;
pub mod error;

// Conditional module imports based on features
#[cfg(feature = "js")]
pub mod adapters;

pub use api::{
    CommandQueue, CommandType, CommandValue, EngineStats, EventQueue, EventType, Rgba,
    ScriptInfo, UiTree, UiTreeNode, Widget, WidgetCommand, WidgetEvent, WidgetInfo,
    WidgetScriptBinding, WidgetType,
};
pub use error::{Result, ScriptError};

#[cfg(feature = "js")]
pub use adapters::{ScriptEngine, ScriptEngineConfig};
