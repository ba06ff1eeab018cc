//! Runtime Adapters
//!
//! Language-specific bindings that expose the `api` types to scripts.

#[cfg(feature = "js")]
pub mod js;

#[cfg(feature = "js")]
pub use js::{ScriptEngine, ScriptEngineConfig};
