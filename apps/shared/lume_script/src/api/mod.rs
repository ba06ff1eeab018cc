//! Runtime-agnostic script API
//!
//! The queues, widget model, tree index and widget capability table defined here
//! carry no scripting-language types. Runtime adapters (see `adapters`) expose
//! them to scripts.

pub mod command_queue;
pub mod console;
pub mod event_queue;
pub mod script;
pub mod ui_tree;
pub mod widget;
pub mod widget_api;

pub use command_queue::{CommandQueue, CommandType, CommandValue, WidgetCommand};
pub use console::ConsoleApi;
pub use event_queue::{DEFAULT_EVENT_QUEUE_CAPACITY, EventQueue, EventType, WidgetEvent};
pub use script::{EngineStats, ScriptInfo, WidgetScriptBinding};
pub use ui_tree::{NodeId, SYNTHETIC_ROOT_ID, UiTree, UiTreeNode};
pub use widget::{Rgba, Widget, WidgetInfo, WidgetType};
pub use widget_api::{WidgetCommands, WidgetMethod, reserved_names, widget_methods};
