//! Errors raised by the index engine.
//!
//! The driver passes these through to clients unchanged: the numeric
//! kind code goes on the wire next to the message.

use std::fmt;
use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Classification of engine failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineErrorKind {
    InvalidArgument,
    DocNotFound,
    DatabaseOpening,
    DatabaseCorrupt,
    Database,
    InvalidOperation,
    FeatureUnavailable,
    QueryParser,
    Wildcard,
}

impl EngineErrorKind {
    /// Stable numeric code used in error replies
    pub fn code(self) -> u32 {
        match self {
            EngineErrorKind::InvalidArgument => 1,
            EngineErrorKind::DocNotFound => 2,
            EngineErrorKind::DatabaseOpening => 3,
            EngineErrorKind::DatabaseCorrupt => 4,
            EngineErrorKind::Database => 5,
            EngineErrorKind::InvalidOperation => 6,
            EngineErrorKind::FeatureUnavailable => 7,
            EngineErrorKind::QueryParser => 8,
            EngineErrorKind::Wildcard => 9,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EngineErrorKind::InvalidArgument => "InvalidArgumentError",
            EngineErrorKind::DocNotFound => "DocNotFoundError",
            EngineErrorKind::DatabaseOpening => "DatabaseOpeningError",
            EngineErrorKind::DatabaseCorrupt => "DatabaseCorruptError",
            EngineErrorKind::Database => "DatabaseError",
            EngineErrorKind::InvalidOperation => "InvalidOperationError",
            EngineErrorKind::FeatureUnavailable => "FeatureUnavailableError",
            EngineErrorKind::QueryParser => "QueryParserError",
            EngineErrorKind::Wildcard => "WildcardError",
        }
    }
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An engine failure with its native kind preserved
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::InvalidArgument, message)
    }

    pub fn doc_not_found(docid: u32) -> Self {
        Self::new(
            EngineErrorKind::DocNotFound,
            format!("Document {docid} not found"),
        )
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::InvalidOperation, message)
    }

    pub fn no_database() -> Self {
        Self::new(EngineErrorKind::Database, "No database is open")
    }
}
