//! Error types for cask-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid path: {0:?}")]
    InvalidPath(String),

    #[error("Reducer not found: {0}")]
    UnresolvedReducer(String),

    #[error("Cannot read {path}: parent is {found}, not a map")]
    NotAMap { path: String, found: &'static str },

    #[error("Plugin {plugin} failed in {hook}: {message}")]
    PluginHook {
        plugin: String,
        hook: &'static str,
        message: String,
    },

    #[error("Plugin {plugin} timed out in {hook}")]
    HookTimeout { plugin: String, hook: &'static str },

    #[error("Reducer {name} failed: {message}")]
    Reducer { name: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<ron::error::SpannedError> for Error {
    fn from(err: ron::error::SpannedError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
