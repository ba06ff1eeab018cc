//! JavaScript Runtime Adapter (QuickJS)
//!
//! Runs widget scripts on a single QuickJS context via rquickjs.

pub mod bindings;
mod config;
mod engine;
pub mod projection;

pub use config::ScriptEngineConfig;
pub use engine::ScriptEngine;
