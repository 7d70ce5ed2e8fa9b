//! Binary command driver.
//!
//! Decodes client requests, runs them against the session's engine and
//! resources, and encodes replies:
//!
//! - `codec`: typed little-endian reader and writer
//! - `registry`: per-session handles for documents, result sets, cursors...
//! - `query_builder`, `editor`, `enquire_program`: request sub-languages
//! - `cursor` and `schema`: paged row streams
//! - `session`: one opcode in, one reply out
//! - `transport` and `server`: framing and the stdio/TCP loops

pub mod codec;
pub mod cursor;
pub mod editor;
pub mod enquire_program;
pub mod error;
pub mod opcodes;
pub mod query_builder;
pub mod registry;
pub mod resources;
pub mod schema;
pub mod server;
pub mod session;
pub mod transport;

pub use error::{DriverError, DriverResult};
pub use registry::{Handle, Registry, ResourceType};
pub use server::Server;
pub use session::Session;
