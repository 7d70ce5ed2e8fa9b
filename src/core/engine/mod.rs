//! Embedded index engine.
//!
//! The driver talks to an index only through [`IndexEngine`]. The crate
//! ships one implementation, [`LocalEngine`], which keeps every shard in
//! memory and persists it as a JSON snapshot inside the index directory.

pub mod document;
pub mod encoding;
pub mod enquire;
pub mod error;
pub mod local;
pub mod query;
pub mod shard;
pub mod spy;
pub mod weight;

pub use document::{DocId, Document, TermCount, TermEntry, TermPos, ValueSlot};
pub use enquire::{DocidOrder, Enquire, MSet, MSetItem, MultiValueKeyMaker, SortOrder};
pub use error::{EngineError, EngineErrorKind, EngineResult};
pub use local::LocalEngine;
pub use query::{Query, QueryOp};
pub use spy::ValueCountMatchSpy;
pub use weight::{Bm25Params, WeightStats, Weighting};

use std::path::Path;
use std::sync::Arc;

/// How an index is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only; may be combined with other read-only shards
    Read,
    CreateOrOpen,
    /// Fails if the index already exists
    Create,
    CreateOrOverwrite,
    /// Fails if the index does not exist
    Open,
}

impl OpenMode {
    pub fn is_writable(self) -> bool {
        !matches!(self, OpenMode::Read)
    }
}

/// What a session currently has open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseState {
    Closed,
    ReadOnly,
    Writable,
}

/// A remote backend description
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSpec {
    Program {
        program: String,
        args: String,
        timeout: u32,
    },
    Tcp {
        host: String,
        port: u16,
        timeout: u32,
        connect_timeout: u32,
    },
}

/// A document considered by a match
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Docid across all open shards
    pub docid: DocId,
    /// Zero-based shard number
    pub db_number: u32,
    /// Docid inside its shard
    pub sub_docid: DocId,
    pub document: Arc<Document>,
}

/// Capabilities the driver needs from an index
pub trait IndexEngine: Send {
    fn state(&self) -> DatabaseState;

    fn is_writable(&self) -> bool {
        self.state() == DatabaseState::Writable
    }

    fn open(&mut self, mode: OpenMode, path: &Path) -> EngineResult<()>;

    fn open_remote(&mut self, mode: OpenMode, remote: &RemoteSpec) -> EngineResult<()>;

    /// Flush and drop everything that is open
    fn close(&mut self) -> EngineResult<()>;

    // Statistics

    fn doccount(&self) -> u32;
    fn last_docid(&self) -> DocId;
    fn avlength(&self) -> f64;
    fn has_positions(&self) -> bool;
    fn termfreq(&self, term: &str) -> u32;
    fn collection_freq(&self, term: &str) -> u32;

    fn term_exists(&self, term: &str) -> bool {
        self.termfreq(term) > 0
    }

    fn value_freq(&self, slot: ValueSlot) -> u32;
    fn value_lower_bound(&self, slot: ValueSlot) -> Vec<u8>;
    fn value_upper_bound(&self, slot: ValueSlot) -> Vec<u8>;
    fn doclength_lower_bound(&self) -> u32;
    fn doclength_upper_bound(&self) -> u32;
    fn wdf_upper_bound(&self, term: &str) -> u32;
    fn doclength(&self, docid: DocId) -> EngineResult<u32>;
    fn uuid(&self) -> String;
    fn metadata(&self, key: &str) -> Vec<u8>;

    /// Every distinct term starting with `prefix`, sorted
    fn terms_with_prefix(&self, prefix: &str) -> Vec<String>;

    // Documents

    fn document(&self, docid: DocId) -> EngineResult<Arc<Document>>;

    /// Docids of documents indexed by `term`, ascending
    fn postlist(&self, term: &str) -> Vec<DocId>;

    /// Every document, for a full-scan match
    fn candidates(&self) -> Vec<Candidate>;

    fn add_document(&mut self, doc: Document) -> EngineResult<DocId>;
    fn replace_document(&mut self, docid: DocId, doc: Document) -> EngineResult<()>;

    /// Replace the first document indexed by `term`, delete the others,
    /// add the document if none match
    fn replace_document_by_term(&mut self, term: &str, doc: Document) -> EngineResult<DocId>;
    fn delete_document(&mut self, docid: DocId) -> EngineResult<()>;
    fn delete_documents_by_term(&mut self, term: &str) -> EngineResult<()>;
    fn set_metadata(&mut self, key: &str, value: &[u8]) -> EngineResult<()>;

    fn begin_transaction(&mut self) -> EngineResult<()>;
    fn cancel_transaction(&mut self) -> EngineResult<()>;
    fn commit_transaction(&mut self) -> EngineResult<()>;
}
