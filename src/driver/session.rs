//! Session dispatcher.
//!
//! A [`Session`] owns one engine, one resource registry and the default
//! query parser. [`Session::handle`] takes one request (opcode byte plus
//! payload) and always returns one reply: status `0` followed by the
//! operation's output, or status `1` followed by `kind`, `code` and
//! `message`. A failed request leaves the session and its resources
//! usable.

use crate::core::config::{Config, LimitsConfig};
use crate::core::engine::{
    DatabaseState, DocId, Document, EngineError, EngineErrorKind, Enquire, IndexEngine,
    LocalEngine, MSet, OpenMode, RemoteSpec, ValueCountMatchSpy,
};
use crate::core::text::{QueryParser, Stemmer};
use crate::driver::codec::{Decoder, Encoder};
use crate::driver::cursor::{self, Cursor};
use crate::driver::editor::EditProgram;
use crate::driver::enquire_program::EnquireProgram;
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::opcodes::{Opcode, STATUS_ERROR, STATUS_OK};
use crate::driver::query_builder::QueryNode;
use crate::driver::registry::{Handle, Registry, ResourceType};
use crate::driver::resources;
use crate::driver::schema::{DocumentSchema, TermSchema};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

// Open modes
const READ_OPEN: u8 = 0;
const WRITE_CREATE_OR_OPEN: u8 = 1;
const WRITE_CREATE: u8 = 2;
const WRITE_CREATE_OR_OVERWRITE: u8 = 3;
const WRITE_OPEN: u8 = 4;

// Document id kinds
const UNIQUE_DOCID: u8 = 0;
const UNIQUE_TERM: u8 = 1;

// TEST subcommands
const TEST_RESULT_ENCODER: u8 = 1;
const TEST_EXCEPTION: u8 = 2;
const TEST_ECHO: u8 = 3;

// QLC_INIT list types
const QLC_MSET: u8 = 0;
const QLC_TERMS: u8 = 1;
const QLC_SPY_TERMS: u8 = 2;

// SPY_TERMS parameters
const SPY_VALUES: u8 = 0;
const SPY_TOP_VALUES: u8 = 1;

// MSET_INFO fields
const MI_MATCHES_LOWER_BOUND: u8 = 1;
const MI_MATCHES_ESTIMATED: u8 = 2;
const MI_MATCHES_UPPER_BOUND: u8 = 3;
const MI_UNCOLLAPSED_LOWER_BOUND: u8 = 4;
const MI_UNCOLLAPSED_ESTIMATED: u8 = 5;
const MI_UNCOLLAPSED_UPPER_BOUND: u8 = 6;
const MI_SIZE: u8 = 7;
const MI_MAX_POSSIBLE: u8 = 8;
const MI_MAX_ATTAINED: u8 = 9;
const MI_TERM_WEIGHT: u8 = 10;
const MI_TERM_FREQ: u8 = 11;

// DB_INFO fields
const DBI_HAS_POSITIONS: u8 = 1;
const DBI_DOCCOUNT: u8 = 2;
const DBI_LASTDOCID: u8 = 3;
const DBI_AVLENGTH: u8 = 4;
const DBI_TERM_EXISTS: u8 = 5;
const DBI_TERM_FREQ: u8 = 6;
const DBI_COLLECTION_FREQ: u8 = 7;
const DBI_VALUE_FREQ: u8 = 8;
const DBI_VALUE_LOWER_BOUND: u8 = 9;
const DBI_VALUE_UPPER_BOUND: u8 = 10;
const DBI_DOCLENGTH_LOWER_BOUND: u8 = 11;
const DBI_DOCLENGTH_UPPER_BOUND: u8 = 12;
const DBI_WDF_UPPER_BOUND: u8 = 13;
const DBI_DOCLENGTH: u8 = 14;
const DBI_UUID: u8 = 15;
const DBI_METADATA: u8 = 16;

/// How a write request names its target document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentId {
    Docid(DocId),
    UniqueTerm(String),
}

impl DocumentId {
    pub fn decode(dec: &mut Decoder<'_>) -> DriverResult<Self> {
        match dec.read_u8()? {
            UNIQUE_DOCID => Ok(DocumentId::Docid(dec.read_u32()?)),
            UNIQUE_TERM => Ok(DocumentId::UniqueTerm(dec.read_string()?)),
            other => Err(DriverError::BadCommand(other)),
        }
    }
}

fn open_mode(tag: u8) -> DriverResult<OpenMode> {
    match tag {
        READ_OPEN => Ok(OpenMode::Read),
        WRITE_CREATE_OR_OPEN => Ok(OpenMode::CreateOrOpen),
        WRITE_CREATE => Ok(OpenMode::Create),
        WRITE_CREATE_OR_OVERWRITE => Ok(OpenMode::CreateOrOverwrite),
        WRITE_OPEN => Ok(OpenMode::Open),
        other => Err(DriverError::BadCommand(other)),
    }
}

/// Encode an error reply
pub fn error_reply(err: &DriverError) -> Vec<u8> {
    let mut enc = Encoder::new();
    write_error(err, &mut enc);
    enc.into_bytes()
}

fn write_error(err: &DriverError, enc: &mut Encoder) {
    enc.reset();
    enc.write_u8(STATUS_ERROR);
    enc.write_u8(err.kind_tag());
    enc.write_u32(err.code());
    enc.write_string(&err.message());
}

/// One client's view of the server
pub struct Session {
    engine: Box<dyn IndexEngine>,
    registry: Registry,
    default_stemmer: Stemmer,
    default_parser: QueryParser,
    limits: LimitsConfig,
    requests: u64,
}

impl Session {
    /// Session over a [`LocalEngine`] rooted at `engine.data_dir`
    pub fn new(config: &Config) -> DriverResult<Self> {
        let engine = LocalEngine::new(&config.engine.data_dir, config.engine.flush_on_commit);
        Self::with_engine(Box::new(engine), config)
    }

    pub fn with_engine(engine: Box<dyn IndexEngine>, config: &Config) -> DriverResult<Self> {
        let default_stemmer = Stemmer::new(&config.engine.default_stemmer)?;
        let mut default_parser = QueryParser::new();
        default_parser.set_stemmer(default_stemmer.clone());
        Ok(Self {
            engine,
            registry: Registry::new(),
            default_stemmer,
            default_parser,
            limits: config.limits.clone(),
            requests: 0,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn state(&self) -> DatabaseState {
        self.engine.state()
    }

    /// Number of requests handled so far
    pub fn request_count(&self) -> u64 {
        self.requests
    }

    /// Execute one request and build its reply
    pub fn handle(&mut self, request: &[u8]) -> Vec<u8> {
        self.requests += 1;
        let mut enc = Encoder::new();
        enc.write_u8(STATUS_OK);
        if let Err(err) = self.dispatch(request, &mut enc) {
            debug!(
                kind = err.kind_tag(),
                code = err.code(),
                "Request failed: {}",
                err
            );
            write_error(&err, &mut enc);
        }
        enc.into_bytes()
    }

    fn dispatch(&mut self, request: &[u8], enc: &mut Encoder) -> DriverResult<()> {
        let mut dec = Decoder::new(request);
        let opcode = Opcode::from_tag(dec.read_u8()?)?;
        debug!(?opcode, bytes = request.len(), "Handling request");

        if opcode.is_mutating() && !self.engine.is_writable() {
            return Err(DriverError::NotWritable);
        }

        match opcode {
            Opcode::Open => self.open(&mut dec),
            Opcode::LastDocId => {
                enc.write_u32(self.engine.last_docid());
                Ok(())
            }
            Opcode::AddDocument => self.add_document(&mut dec, enc),
            Opcode::Test => self.test(&mut dec, enc),
            Opcode::GetDocumentById => self.get_document_by_id(&mut dec, enc),
            Opcode::StartTransaction => Ok(self.engine.begin_transaction()?),
            Opcode::CancelTransaction => Ok(self.engine.cancel_transaction()?),
            Opcode::CommitTransaction => Ok(self.engine.commit_transaction()?),
            Opcode::QueryPage => self.query_page(&mut dec, enc),
            Opcode::SetDefaultStemmer => self.set_default_stemmer(&mut dec),
            Opcode::SetDefaultPrefixes => self.set_default_prefixes(&mut dec),
            Opcode::Enquire => self.enquire(&mut dec, enc),
            Opcode::ReleaseResource => {
                let kind = ResourceType::from_tag(dec.read_u8()?)?;
                let handle = dec.read_u32()?;
                self.registry.release(kind, handle)
            }
            Opcode::MatchSet => self.match_set(&mut dec, enc),
            Opcode::QlcInit => self.qlc_init(&mut dec, enc),
            Opcode::QlcNextPortion => self.qlc_next_portion(&mut dec, enc),
            Opcode::QlcLookup => {
                let cursor = self.registry.get::<Cursor>(dec.read_u32()?)?;
                let keys = cursor.decode_keys(&mut dec)?;
                cursor.lookup(&keys, enc).map(|_| ())
            }
            Opcode::GetResourceInfo => {
                let resources = self.registry.list();
                enc.write_u32(resources.len() as u32);
                for info in resources {
                    enc.write_u8(info.kind.tag());
                    enc.write_u32(info.handle);
                    enc.write_string(&info.name);
                }
                Ok(())
            }
            Opcode::CreateResource => {
                let resource = resources::construct(&mut dec)?;
                let kind = resource.kind();
                let handle = self.registry.insert(resource)?;
                enc.write_u8(kind.tag());
                enc.write_u32(handle);
                Ok(())
            }
            Opcode::MSetInfo => self.mset_info(&mut dec, enc),
            Opcode::DbInfo => self.db_info(&mut dec, enc),
            Opcode::SetMetadata => {
                let key = dec.read_string()?;
                let value = dec.read_bytes()?;
                Ok(self.engine.set_metadata(&key, &value)?)
            }
            Opcode::UpdateDocument => self.update_document(&mut dec, enc, false),
            Opcode::UpdateOrCreateDocument => self.update_document(&mut dec, enc, true),
            Opcode::DeleteDocument => match DocumentId::decode(&mut dec)? {
                DocumentId::Docid(docid) => Ok(self.engine.delete_document(docid)?),
                DocumentId::UniqueTerm(term) => Ok(self.engine.delete_documents_by_term(&term)?),
            },
            Opcode::ReplaceDocument => self.replace_document(&mut dec, enc),
            Opcode::Document => {
                let doc = self.find_document(&DocumentId::decode(&mut dec)?)?;
                enc.write_u32(self.registry.create(doc)?);
                Ok(())
            }
            Opcode::OpenProg => {
                let mode = open_mode(dec.read_u8()?)?;
                let remote = RemoteSpec::Program {
                    program: dec.read_string()?,
                    args: dec.read_string()?,
                    timeout: dec.read_u32()?,
                };
                Ok(self.engine.open_remote(mode, &remote)?)
            }
            Opcode::OpenTcp => {
                let mode = open_mode(dec.read_u8()?)?;
                let remote = RemoteSpec::Tcp {
                    host: dec.read_string()?,
                    port: dec.read_u16()?,
                    timeout: dec.read_u32()?,
                    connect_timeout: dec.read_u32()?,
                };
                Ok(self.engine.open_remote(mode, &remote)?)
            }
            Opcode::Close => Ok(self.engine.close()?),
        }
    }

    fn require_open(&self) -> DriverResult<()> {
        if self.engine.state() == DatabaseState::Closed {
            return Err(EngineError::no_database().into());
        }
        Ok(())
    }

    /// The engine, when an index is open, for statistics and wildcards
    fn open_engine(&self) -> Option<&dyn IndexEngine> {
        match self.engine.state() {
            DatabaseState::Closed => None,
            _ => Some(self.engine.as_ref()),
        }
    }

    fn open(&mut self, dec: &mut Decoder<'_>) -> DriverResult<()> {
        let mode = open_mode(dec.read_u8()?)?;
        let path = dec.read_string()?;
        if path.is_empty() {
            return Err(DriverError::BadArgument("Index path is empty".to_string()));
        }
        self.engine.open(mode, Path::new(&path))?;
        info!(%path, ?mode, state = ?self.engine.state(), "Index opened");
        Ok(())
    }

    fn new_document(&self, program: &EditProgram) -> DriverResult<Document> {
        let mut doc = Document::new();
        program.apply(&mut doc, &self.default_stemmer)?;
        Ok(doc)
    }

    fn add_document(&mut self, dec: &mut Decoder<'_>, enc: &mut Encoder) -> DriverResult<()> {
        let program = EditProgram::decode(dec)?;
        let doc = self.new_document(&program)?;
        let docid = self.engine.add_document(doc)?;
        enc.write_u32(docid);
        Ok(())
    }

    fn replace_document(&mut self, dec: &mut Decoder<'_>, enc: &mut Encoder) -> DriverResult<()> {
        let program = EditProgram::decode(dec)?;
        let id = DocumentId::decode(dec)?;
        let doc = self.new_document(&program)?;
        let docid = match id {
            DocumentId::Docid(docid) => {
                self.engine.replace_document(docid, doc)?;
                docid
            }
            DocumentId::UniqueTerm(term) => self.engine.replace_document_by_term(&term, doc)?,
        };
        enc.write_u32(docid);
        Ok(())
    }

    fn update_document(
        &mut self,
        dec: &mut Decoder<'_>,
        enc: &mut Encoder,
        create: bool,
    ) -> DriverResult<()> {
        let program = EditProgram::decode(dec)?;
        let id = DocumentId::decode(dec)?;

        let docid = match id {
            DocumentId::Docid(docid) => {
                let mut doc = match self.engine.document(docid) {
                    Ok(doc) => Document::clone(&*doc),
                    Err(e) if create && e.kind == EngineErrorKind::DocNotFound => Document::new(),
                    Err(e) => return Err(e.into()),
                };
                program.apply(&mut doc, &self.default_stemmer)?;
                self.engine.replace_document(docid, doc)?;
                docid
            }
            DocumentId::UniqueTerm(term) => {
                let matches = self.engine.postlist(&term);
                if matches.is_empty() {
                    if !create {
                        return Err(DriverError::BadArgument(format!(
                            "No document is indexed by '{term}'"
                        )));
                    }
                    let doc = self.new_document(&program)?;
                    self.engine.add_document(doc)?
                } else {
                    // Edit every copy before writing any of them
                    let mut edited = Vec::with_capacity(matches.len());
                    for &docid in &matches {
                        let mut doc = Document::clone(&*self.engine.document(docid)?);
                        program.apply(&mut doc, &self.default_stemmer)?;
                        edited.push((docid, doc));
                    }
                    for (docid, doc) in edited {
                        self.engine.replace_document(docid, doc)?;
                    }
                    // No new document
                    0
                }
            }
        };
        enc.write_u32(docid);
        Ok(())
    }

    fn find_document(&self, id: &DocumentId) -> DriverResult<Document> {
        self.require_open()?;
        match id {
            DocumentId::Docid(docid) => Ok(Document::clone(&*self.engine.document(*docid)?)),
            DocumentId::UniqueTerm(term) => {
                let docid = self.engine.postlist(term).first().copied().ok_or_else(|| {
                    DriverError::BadArgument(format!("No document is indexed by '{term}'"))
                })?;
                Ok(Document::clone(&*self.engine.document(docid)?))
            }
        }
    }

    fn get_document_by_id(&mut self, dec: &mut Decoder<'_>, enc: &mut Encoder) -> DriverResult<()> {
        let docid = dec.read_u32()?;
        let schema = DocumentSchema::decode(dec)?;
        self.require_open()?;
        let doc = self.engine.document(docid)?;
        schema.emit_document(&doc, enc)
    }

    fn test(&mut self, dec: &mut Decoder<'_>, enc: &mut Encoder) -> DriverResult<()> {
        match dec.read_u8()? {
            TEST_RESULT_ENCODER => {
                let from = dec.read_u32()?;
                let to = dec.read_u32()?;
                if from <= to && to - from >= self.limits.max_page_size {
                    return Err(DriverError::BadArgument(format!(
                        "Encoder test range {from}..={to} is too large"
                    )));
                }
                for value in from..=to {
                    enc.write_u32(value);
                }
                Ok(())
            }
            TEST_EXCEPTION => Err(DriverError::BadArgument("Test exception".to_string())),
            TEST_ECHO => {
                let len = dec.read_u32()?;
                for _ in 0..len {
                    enc.write_u8(dec.read_u8()?);
                }
                Ok(())
            }
            other => Err(DriverError::BadCommand(other)),
        }
    }

    fn query_page(&mut self, dec: &mut Decoder<'_>, enc: &mut Encoder) -> DriverResult<()> {
        let offset = dec.read_u32()?;
        let pagesize = dec.read_u32()?.min(self.limits.max_page_size);
        let tree = QueryNode::decode(dec, self.limits.max_query_depth)?;
        let schema = DocumentSchema::decode(dec)?;
        self.require_open()?;

        let mut enquire = Enquire::new();
        enquire.set_query(tree.build(&self.default_parser, self.open_engine())?, 0);
        let mset = enquire.get_mset(self.engine.as_ref(), offset, pagesize, &mut [])?;

        enc.write_u32(mset.size());
        for item in mset.items() {
            schema.emit_item(item, enc);
        }
        Ok(())
    }

    fn set_default_stemmer(&mut self, dec: &mut Decoder<'_>) -> DriverResult<()> {
        let stemmer = Stemmer::new(&dec.read_string()?)?;
        self.default_parser.set_stemmer(stemmer.clone());
        info!(stemmer = stemmer.name(), "Default stemmer changed");
        self.default_stemmer = stemmer;
        Ok(())
    }

    fn set_default_prefixes(&mut self, dec: &mut Decoder<'_>) -> DriverResult<()> {
        let count = dec.read_u32()?;
        let mut parser = self.default_parser.clone();
        for _ in 0..count {
            let field = dec.read_string()?;
            let prefix = dec.read_string()?;
            let boolean = dec.read_bool()?;
            let exclusive = dec.read_bool()?;
            if boolean {
                parser.add_boolean_prefix(&field, &prefix, exclusive)?;
            } else {
                parser.add_prefix(&field, &prefix)?;
            }
        }
        self.default_parser = parser;
        Ok(())
    }

    fn enquire(&mut self, dec: &mut Decoder<'_>, enc: &mut Encoder) -> DriverResult<()> {
        let program = EnquireProgram::decode(dec, self.limits.max_query_depth)?;
        let enquire = program.build(&self.registry, &self.default_parser, self.open_engine())?;
        enc.write_u32(self.registry.create(enquire)?);
        Ok(())
    }

    fn match_set(&mut self, dec: &mut Decoder<'_>, enc: &mut Encoder) -> DriverResult<()> {
        let enquire = self.registry.get::<Enquire>(dec.read_u32()?)?.clone();
        let first = dec.read_u32()?;
        let undefined = dec.read_bool()?;
        let maxitems = if undefined {
            self.engine.doccount()
        } else {
            dec.read_u32()?
        };
        // Exhaustive matching always checks every document
        let _checkatleast = dec.read_u32()?;

        let mut spy_handles = BTreeSet::new();
        loop {
            match dec.read_u32()? {
                0 => break,
                handle => {
                    spy_handles.insert(handle);
                }
            }
        }
        for &handle in &spy_handles {
            if self.registry.get::<ValueCountMatchSpy>(handle)?.is_finalized() {
                return Err(DriverError::MatchSpyFinalized(handle));
            }
        }
        self.require_open()?;

        let mut spies: Vec<(Handle, ValueCountMatchSpy)> = Vec::with_capacity(spy_handles.len());
        for &handle in &spy_handles {
            spies.push((handle, self.registry.take::<ValueCountMatchSpy>(handle)?));
        }
        let result = {
            let mut attached: Vec<&mut ValueCountMatchSpy> =
                spies.iter_mut().map(|(_, spy)| spy).collect();
            enquire.get_mset(self.engine.as_ref(), first, maxitems, &mut attached)
        };
        for (handle, spy) in spies {
            self.registry.put_back(handle, spy);
        }

        let mset = result?;
        debug!(size = mset.size(), estimated = mset.matches_estimated, "Match set ready");
        enc.write_u32(self.registry.create(Arc::new(mset))?);
        Ok(())
    }

    fn expect_resource(
        &self,
        dec: &mut Decoder<'_>,
        expected: ResourceType,
    ) -> DriverResult<Handle> {
        let kind = ResourceType::from_tag(dec.read_u8()?)?;
        let handle = dec.read_u32()?;
        if kind != expected {
            return Err(DriverError::BadArgument(format!(
                "Expected a {expected} resource, got {kind}"
            )));
        }
        Ok(handle)
    }

    fn qlc_init(&mut self, dec: &mut Decoder<'_>, enc: &mut Encoder) -> DriverResult<()> {
        let cursor = match dec.read_u8()? {
            QLC_MSET => {
                let handle = self.expect_resource(dec, ResourceType::ResultSet)?;
                let mset = Arc::clone(self.registry.get::<Arc<MSet>>(handle)?);
                Cursor::over_mset(mset, DocumentSchema::decode(dec)?)
            }
            QLC_TERMS => {
                let handle = self.expect_resource(dec, ResourceType::Document)?;
                let doc = self.registry.get::<Document>(handle)?;
                let rows = cursor::document_term_rows(doc, self.open_engine());
                Cursor::over_sorted_terms(rows, TermSchema::decode(dec)?)
            }
            QLC_SPY_TERMS => {
                let handle = self.expect_resource(dec, ResourceType::MatchSpy)?;
                let spy = self.registry.get::<ValueCountMatchSpy>(handle)?;
                match dec.read_u8()? {
                    SPY_VALUES => Cursor::over_sorted_terms(
                        cursor::spy_term_rows(spy, None),
                        TermSchema::decode(dec)?,
                    ),
                    SPY_TOP_VALUES => {
                        let max = dec.read_u32()? as usize;
                        Cursor::over_terms(
                            cursor::spy_term_rows(spy, Some(max)),
                            TermSchema::decode(dec)?,
                        )
                    }
                    other => return Err(DriverError::BadCommand(other)),
                }
            }
            other => return Err(DriverError::BadCommand(other)),
        };

        let size = cursor.size();
        let handle = self.registry.create(cursor)?;
        enc.write_u32(handle);
        enc.write_u32(size);
        Ok(())
    }

    fn qlc_next_portion(&mut self, dec: &mut Decoder<'_>, enc: &mut Encoder) -> DriverResult<()> {
        let handle = dec.read_u32()?;
        let from = dec.read_u32()?;
        let count = dec.read_u32()?.min(self.limits.max_page_size);
        self.registry.get::<Cursor>(handle)?.page(from, count, enc);
        Ok(())
    }

    fn mset_info(&mut self, dec: &mut Decoder<'_>, enc: &mut Encoder) -> DriverResult<()> {
        let mset = Arc::clone(self.registry.get::<Arc<MSet>>(dec.read_u32()?)?);
        loop {
            match dec.read_u8()? {
                0 => return Ok(()),
                MI_MATCHES_LOWER_BOUND => enc.write_u32(mset.matches_lower_bound),
                MI_MATCHES_ESTIMATED => enc.write_u32(mset.matches_estimated),
                MI_MATCHES_UPPER_BOUND => enc.write_u32(mset.matches_upper_bound),
                MI_UNCOLLAPSED_LOWER_BOUND => enc.write_u32(mset.uncollapsed_lower_bound),
                MI_UNCOLLAPSED_ESTIMATED => enc.write_u32(mset.uncollapsed_estimated),
                MI_UNCOLLAPSED_UPPER_BOUND => enc.write_u32(mset.uncollapsed_upper_bound),
                MI_SIZE => enc.write_u32(mset.size()),
                MI_MAX_POSSIBLE => enc.write_f64(mset.max_possible),
                MI_MAX_ATTAINED => enc.write_f64(mset.max_attained),
                MI_TERM_WEIGHT => enc.write_f64(mset.termweight(&dec.read_string()?)?),
                MI_TERM_FREQ => enc.write_u32(mset.termfreq(&dec.read_string()?)?),
                other => return Err(DriverError::BadCommand(other)),
            }
        }
    }

    fn db_info(&mut self, dec: &mut Decoder<'_>, enc: &mut Encoder) -> DriverResult<()> {
        self.require_open()?;
        let engine = self.engine.as_ref();
        loop {
            match dec.read_u8()? {
                0 => return Ok(()),
                DBI_HAS_POSITIONS => enc.write_bool(engine.has_positions()),
                DBI_DOCCOUNT => enc.write_u32(engine.doccount()),
                DBI_LASTDOCID => enc.write_u32(engine.last_docid()),
                DBI_AVLENGTH => enc.write_f64(engine.avlength()),
                DBI_TERM_EXISTS => enc.write_bool(engine.term_exists(&dec.read_string()?)),
                DBI_TERM_FREQ => enc.write_u32(engine.termfreq(&dec.read_string()?)),
                DBI_COLLECTION_FREQ => enc.write_u32(engine.collection_freq(&dec.read_string()?)),
                DBI_VALUE_FREQ => enc.write_u32(engine.value_freq(dec.read_u32()?)),
                DBI_VALUE_LOWER_BOUND => enc.write_bytes(&engine.value_lower_bound(dec.read_u32()?)),
                DBI_VALUE_UPPER_BOUND => enc.write_bytes(&engine.value_upper_bound(dec.read_u32()?)),
                DBI_DOCLENGTH_LOWER_BOUND => enc.write_u32(engine.doclength_lower_bound()),
                DBI_DOCLENGTH_UPPER_BOUND => enc.write_u32(engine.doclength_upper_bound()),
                DBI_WDF_UPPER_BOUND => enc.write_u32(engine.wdf_upper_bound(&dec.read_string()?)),
                DBI_DOCLENGTH => enc.write_u32(engine.doclength(dec.read_u32()?)?),
                DBI_UUID => enc.write_string(&engine.uuid()),
                DBI_METADATA => enc.write_bytes(&engine.metadata(&dec.read_string()?)),
                other => return Err(DriverError::BadCommand(other)),
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!(
            requests = self.requests,
            resources = self.registry.len(),
            "Session closed"
        );
        self.registry.clear();
    }
}
