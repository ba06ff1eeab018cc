use thiserror::Error;

/// Errors surfaced to callers of the script engine
///
/// Only load/registration misuse and lifecycle faults end up here. Faults raised
/// by script handlers are contained and logged by the engine.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Script engine is already running")]
    AlreadyRunning,

    #[error("Script not loaded: {0}")]
    ScriptNotLoaded(String),

    #[error("Failed to load script '{path}': {message}")]
    Load { path: String, message: String },

    #[cfg(feature = "js")]
    #[error("JavaScript runtime error: {0}")]
    Runtime(#[from] rquickjs::Error),

    #[error("Failed to spawn script worker: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScriptError>;
