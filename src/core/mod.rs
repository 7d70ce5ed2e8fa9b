//! Core domain logic (protocol-agnostic)
//!
//! Everything here is independent of the binary wire protocol.
//!
//! # Architecture
//!
//! - **config**: Configuration loading (TOML + environment)
//! - **error**: Process-level error type and Result alias
//! - **engine**: The embedded index engine and its capability trait
//! - **text**: Tokenizing, stemming, term generation, query parsing
//! - **sortable**: Order-preserving float serialization
//! - **xdg**: XDG directory handling

pub mod config;
pub mod engine;
pub mod error;
pub mod sortable;
pub mod text;
pub mod xdg;

// Re-export key types for convenience
pub use config::Config;
pub use error::{LexportError, Result};
