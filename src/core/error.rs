//! Process-level errors.
//!
//! Used by the configuration loader, the binaries and the CLI. Errors
//! inside a session are [`DriverError`](crate::driver::DriverError)s and
//! never reach this type.

use crate::core::engine::EngineError;
use thiserror::Error;

/// Result type alias for process-level operations
pub type Result<T> = std::result::Result<T, LexportError>;

/// Main error type for the lexport binaries
#[derive(Error, Debug)]
pub enum LexportError {
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}
