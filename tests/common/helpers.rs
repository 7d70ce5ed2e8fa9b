// Test helper functions

use lexport::core::config::Config;
use lexport::driver::codec::{Decoder, Encoder};
use lexport::driver::opcodes::{Opcode, MORE, STATUS_ERROR, STATUS_OK, STOP};
use lexport::Session;
use tempfile::TempDir;

/// A decoded reply
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok(Vec<u8>),
    Err { kind: u8, code: u32, message: String },
}

impl Reply {
    pub fn parse(bytes: &[u8]) -> Self {
        match bytes.first() {
            Some(&STATUS_OK) => Reply::Ok(bytes[1..].to_vec()),
            Some(&STATUS_ERROR) => {
                let mut dec = Decoder::new(&bytes[1..]);
                let reply = Reply::Err {
                    kind: dec.read_u8().unwrap(),
                    code: dec.read_u32().unwrap(),
                    message: dec.read_string().unwrap(),
                };
                assert!(dec.is_empty(), "trailing bytes after error reply");
                reply
            }
            other => panic!("bad status byte {other:?}"),
        }
    }

    /// Success body; panics with the error otherwise
    #[allow(dead_code)]
    pub fn body(self) -> Vec<u8> {
        match self {
            Reply::Ok(body) => body,
            Reply::Err {
                kind,
                code,
                message,
            } => panic!("request failed: kind {kind}, code {code}: {message}"),
        }
    }

    /// Body holding a single u32
    #[allow(dead_code)]
    pub fn u32(self) -> u32 {
        let body = self.body();
        let mut dec = Decoder::new(&body);
        let value = dec.read_u32().unwrap();
        assert!(dec.is_empty(), "expected a single u32, got {body:?}");
        value
    }

    /// `(kind, code)` of an error reply
    #[allow(dead_code)]
    pub fn error(self) -> (u8, u32) {
        match self {
            Reply::Err { kind, code, .. } => (kind, code),
            Reply::Ok(body) => panic!("expected an error, got success {body:?}"),
        }
    }
}

/// A session over a temporary data directory
pub struct TestSession {
    pub session: Session,
    // Dropped after the session
    pub temp: TempDir,
}

impl TestSession {
    #[allow(dead_code)]
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("Failed to create temp dir");
        let session = Session::new(&Self::config(&temp)).expect("Failed to create session");
        Self { session, temp }
    }

    /// Test configuration rooted at `temp`
    pub fn config(temp: &TempDir) -> Config {
        let mut config = Config::default();
        config.engine.data_dir = temp.path().to_path_buf();
        config
    }

    /// Replace the session with a fresh one on the same directory
    #[allow(dead_code)]
    pub fn restart(&mut self) {
        self.session = Session::new(&Self::config(&self.temp)).expect("Failed to create session");
    }

    pub fn call(&mut self, opcode: Opcode, body: impl FnOnce(&mut Encoder)) -> Reply {
        let mut enc = Encoder::new();
        enc.write_u8(opcode.tag());
        body(&mut enc);
        Reply::parse(&self.session.handle(enc.as_bytes()))
    }

    #[allow(dead_code)]
    pub fn open(&mut self, mode: u8, path: &str) -> Reply {
        self.call(Opcode::Open, |e| {
            e.write_u8(mode);
            e.write_string(path);
        })
    }

    /// Open `path` with WRITE_CREATE_OR_OPEN
    #[allow(dead_code)]
    pub fn open_writable(&mut self, path: &str) {
        self.open(1, path).body();
    }

    /// ADD_DOCUMENT with an edit program; returns the new docid
    #[allow(dead_code)]
    pub fn add(&mut self, program: &super::Edit) -> u32 {
        self.call(Opcode::AddDocument, |e| program.encode(e)).u32()
    }

    #[allow(dead_code)]
    pub fn doccount(&mut self) -> u32 {
        self.call(Opcode::DbInfo, |e| {
            e.write_u8(2);
            e.write_u8(0);
        })
        .u32()
    }

    /// Register the document named by `term` and return its handle
    #[allow(dead_code)]
    pub fn document_by_term(&mut self, term: &str) -> u32 {
        self.call(Opcode::Document, |e| {
            e.write_u8(1);
            e.write_string(term);
        })
        .u32()
    }

    /// Run a single-query enquire and return the result set handle
    #[allow(dead_code)]
    pub fn match_all_terms(&mut self, query: impl Fn(&mut Encoder)) -> u32 {
        let enquire = self
            .call(Opcode::Enquire, |e| {
                e.write_u8(1); // EC_QUERY
                query(e);
                e.write_u8(0);
            })
            .u32();
        self.call(Opcode::MatchSet, |e| {
            e.write_u32(enquire);
            e.write_u32(0);
            e.write_bool(true);
            e.write_u32(0);
            e.write_u32(0);
        })
        .u32()
    }

    /// QLC_NEXT_PORTION, returning the raw row stream
    #[allow(dead_code)]
    pub fn next_portion(&mut self, cursor: u32, from: u32, count: u32) -> Vec<u8> {
        self.call(Opcode::QlcNextPortion, |e| {
            e.write_u32(cursor);
            e.write_u32(from);
            e.write_u32(count);
        })
        .body()
    }
}

/// Split a MORE/STOP row stream, reading each row with `row`
#[allow(dead_code)]
pub fn read_rows<T>(body: &[u8], mut row: impl FnMut(&mut Decoder<'_>) -> T) -> Vec<T> {
    let mut dec = Decoder::new(body);
    let mut rows = Vec::new();
    loop {
        match dec.read_u8().unwrap() {
            MORE => rows.push(row(&mut dec)),
            STOP => break,
            other => panic!("bad row flag {other}"),
        }
    }
    assert!(dec.is_empty(), "trailing bytes after STOP");
    rows
}

/// Encode a TERM query leaf
#[allow(dead_code)]
pub fn term_query(e: &mut Encoder, name: &str) {
    e.write_u8(4);
    e.write_string(name);
    e.write_u32(1);
    e.write_u32(0);
}
