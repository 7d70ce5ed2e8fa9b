//! lexport - binary command server for an embedded full-text index
//!
//! A client sends small binary commands over one request/response
//! channel; a session decodes each command, runs it against an open
//! index and encodes a binary reply.
//!
//! # Architecture
//!
//! The codebase is organized into three main modules:
//!
//! - **core**: Domain logic (protocol-agnostic)
//!   - config, error, xdg
//!   - engine (documents, matching, weighting, shards)
//!   - text (stemmers, term generator, query parser)
//!
//! - **driver**: Wire protocol adapter (depends on core)
//!   - codec, registry, cursors, session, transport
//!
//! - **cli**: Command-line adapter (depends on core and driver)
//!
//! # Key Features
//!
//! - Typed decoding of every request before anything is mutated
//! - Per-session resource handles that are never reissued
//! - Randomly addressable, paged cursors over result sets and term lists
//! - Errors reported per request; the session always survives

// Core domain logic (protocol-agnostic)
pub mod core;

// Binary protocol adapter
pub mod driver;

// Command-line adapter
pub mod cli;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{LexportError, Result};
pub use driver::{DriverError, Server, Session};
