//! Request-level errors.
//!
//! Any of these aborts the current request only. The session turns them
//! into an error reply (`kind`, `code`, `message`) and keeps serving.

use crate::core::engine::EngineError;
use crate::driver::registry::ResourceType;
use thiserror::Error;

/// Result type alias for driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("Unknown command tag {0}")]
    BadCommand(u8),

    #[error("Bad argument: {0}")]
    BadArgument(String),

    #[error("{kind} resource {handle} not found")]
    ResourceNotFound { kind: ResourceType, handle: u32 },

    #[error("Database is not open for writing")]
    NotWritable,

    #[error("Match spy {0} has already been used in a match")]
    MatchSpyFinalized(u32),

    #[error("Request truncated at offset {offset}: {needed} more bytes needed")]
    Truncated { offset: usize, needed: usize },

    #[error("{0}")]
    Engine(#[from] EngineError),
}

impl DriverError {
    /// Error kind byte sent on the wire
    pub fn kind_tag(&self) -> u8 {
        match self {
            DriverError::BadCommand(_) => 1,
            DriverError::BadArgument(_) => 2,
            DriverError::ResourceNotFound { .. } => 3,
            DriverError::NotWritable => 4,
            DriverError::MatchSpyFinalized(_) => 5,
            DriverError::Truncated { .. } => 6,
            DriverError::Engine(_) => 7,
        }
    }

    /// Numeric sub-code sent next to the kind
    pub fn code(&self) -> u32 {
        match self {
            DriverError::BadCommand(tag) => u32::from(*tag),
            DriverError::BadArgument(_) | DriverError::NotWritable => 0,
            DriverError::ResourceNotFound { handle, .. } => *handle,
            DriverError::MatchSpyFinalized(handle) => *handle,
            DriverError::Truncated { offset, .. } => (*offset).min(u32::MAX as usize) as u32,
            DriverError::Engine(err) => err.kind.code(),
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Errors an editor `ignore` flag may turn into a no-op
    pub fn is_ignorable(&self) -> bool {
        matches!(self, DriverError::BadArgument(_))
    }
}
