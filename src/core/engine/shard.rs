//! A single index directory.
//!
//! The whole shard lives in memory and is written to `lexport.json`
//! inside its directory when flushed.

use super::document::{DocId, Document};
use super::encoding;
use super::error::{EngineError, EngineErrorKind, EngineResult};
use super::OpenMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Snapshot file name inside an index directory
pub const SNAPSHOT_FILE: &str = "lexport.json";

/// Current snapshot format version
pub const FORMAT_VERSION: u32 = 1;

/// Shard contents; cloned whole to back a transaction
#[derive(Debug, Clone)]
pub struct ShardState {
    pub uuid: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_docid: DocId,
    pub metadata: BTreeMap<String, Vec<u8>>,
    pub documents: BTreeMap<DocId, Arc<Document>>,
}

impl ShardState {
    fn fresh() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            created_at: Utc::now(),
            last_docid: 0,
            metadata: BTreeMap::new(),
            documents: BTreeMap::new(),
        }
    }
}

#[derive(Serialize)]
struct SnapshotOut<'a> {
    format_version: u32,
    uuid: &'a Uuid,
    created_at: &'a DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_docid: DocId,
    #[serde(serialize_with = "serialize_metadata")]
    metadata: &'a BTreeMap<String, Vec<u8>>,
    documents: BTreeMap<DocId, &'a Document>,
}

fn serialize_metadata<S: serde::Serializer>(
    metadata: &&BTreeMap<String, Vec<u8>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    encoding::bytes_map::serialize(*metadata, serializer)
}

#[derive(Deserialize)]
struct SnapshotIn {
    format_version: u32,
    uuid: Uuid,
    created_at: DateTime<Utc>,
    last_docid: DocId,
    #[serde(with = "encoding::bytes_map", default)]
    metadata: BTreeMap<String, Vec<u8>>,
    #[serde(default)]
    documents: BTreeMap<DocId, Document>,
}

/// Summary of an index directory, used by the CLI
#[derive(Debug, Clone, Serialize)]
pub struct ShardSummary {
    pub path: PathBuf,
    pub uuid: String,
    pub created_at: DateTime<Utc>,
    pub doccount: usize,
    pub last_docid: DocId,
    pub metadata_keys: usize,
}

/// One open index directory
#[derive(Debug)]
pub struct Shard {
    path: PathBuf,
    writable: bool,
    dirty: bool,
    pub(crate) state: ShardState,
}

impl Shard {
    pub fn snapshot_path(dir: &Path) -> PathBuf {
        dir.join(SNAPSHOT_FILE)
    }

    pub fn exists(dir: &Path) -> bool {
        Self::snapshot_path(dir).is_file()
    }

    /// Open or create the index at `dir` according to `mode`
    pub fn open(dir: &Path, mode: OpenMode) -> EngineResult<Self> {
        let exists = Self::exists(dir);
        let state = match mode {
            OpenMode::Read | OpenMode::Open => {
                if !exists {
                    return Err(EngineError::new(
                        EngineErrorKind::DatabaseOpening,
                        format!("No index found at {}", dir.display()),
                    ));
                }
                Self::load(dir)?
            }
            OpenMode::Create => {
                if exists {
                    return Err(EngineError::new(
                        EngineErrorKind::DatabaseOpening,
                        format!("Index already exists at {}", dir.display()),
                    ));
                }
                ShardState::fresh()
            }
            OpenMode::CreateOrOpen => {
                if exists {
                    Self::load(dir)?
                } else {
                    ShardState::fresh()
                }
            }
            OpenMode::CreateOrOverwrite => ShardState::fresh(),
        };

        let mut shard = Self {
            path: dir.to_path_buf(),
            writable: mode.is_writable(),
            dirty: false,
            state,
        };

        if shard.writable && (!exists || mode == OpenMode::CreateOrOverwrite) {
            shard.dirty = true;
            shard.flush()?;
        }

        tracing::debug!(
            path = %dir.display(),
            ?mode,
            docs = shard.state.documents.len(),
            "Opened index shard"
        );
        Ok(shard)
    }

    fn load(dir: &Path) -> EngineResult<ShardState> {
        let path = Self::snapshot_path(dir);
        let contents = fs::read_to_string(&path).map_err(|e| {
            EngineError::new(
                EngineErrorKind::DatabaseOpening,
                format!("Failed to read {}: {e}", path.display()),
            )
        })?;
        let snapshot: SnapshotIn = serde_json::from_str(&contents).map_err(|e| {
            EngineError::new(
                EngineErrorKind::DatabaseCorrupt,
                format!("Malformed snapshot {}: {e}", path.display()),
            )
        })?;
        if snapshot.format_version > FORMAT_VERSION {
            return Err(EngineError::new(
                EngineErrorKind::DatabaseOpening,
                format!(
                    "Snapshot format v{} is newer than supported v{FORMAT_VERSION}",
                    snapshot.format_version
                ),
            ));
        }

        let documents = snapshot
            .documents
            .into_iter()
            .map(|(docid, mut doc)| {
                doc.set_docid(docid);
                (docid, Arc::new(doc))
            })
            .collect();

        Ok(ShardState {
            uuid: snapshot.uuid,
            created_at: snapshot.created_at,
            last_docid: snapshot.last_docid,
            metadata: snapshot.metadata,
            documents,
        })
    }

    /// Read the summary of the index at `dir` without keeping it open
    pub fn summarize(dir: &Path) -> EngineResult<ShardSummary> {
        let state = Self::load(dir)?;
        Ok(ShardSummary {
            path: dir.to_path_buf(),
            uuid: state.uuid.to_string(),
            created_at: state.created_at,
            doccount: state.documents.len(),
            last_docid: state.last_docid,
            metadata_keys: state.metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn uuid(&self) -> String {
        self.state.uuid.to_string()
    }

    pub fn last_docid(&self) -> DocId {
        self.state.last_docid
    }

    pub fn documents(&self) -> &BTreeMap<DocId, Arc<Document>> {
        &self.state.documents
    }

    pub fn document(&self, docid: DocId) -> Option<&Arc<Document>> {
        self.state.documents.get(&docid)
    }

    pub fn metadata(&self, key: &str) -> Vec<u8> {
        self.state.metadata.get(key).cloned().unwrap_or_default()
    }

    fn ensure_writable(&self) -> EngineResult<()> {
        if !self.writable {
            return Err(EngineError::invalid_operation(format!(
                "Index at {} is open read-only",
                self.path.display()
            )));
        }
        Ok(())
    }

    pub fn insert(&mut self, docid: DocId, mut doc: Document) -> EngineResult<()> {
        self.ensure_writable()?;
        if docid == 0 {
            return Err(EngineError::invalid_argument("Document ID 0 is invalid"));
        }
        doc.set_docid(docid);
        self.state.documents.insert(docid, Arc::new(doc));
        self.state.last_docid = self.state.last_docid.max(docid);
        self.dirty = true;
        Ok(())
    }

    pub fn add(&mut self, doc: Document) -> EngineResult<DocId> {
        let docid = self
            .state
            .last_docid
            .checked_add(1)
            .ok_or_else(|| EngineError::new(EngineErrorKind::Database, "Run out of docids"))?;
        self.insert(docid, doc)?;
        Ok(docid)
    }

    pub fn remove(&mut self, docid: DocId) -> EngineResult<()> {
        self.ensure_writable()?;
        self.state
            .documents
            .remove(&docid)
            .ok_or_else(|| EngineError::doc_not_found(docid))?;
        self.dirty = true;
        Ok(())
    }

    /// Store a metadata entry; an empty value deletes the key
    pub fn set_metadata(&mut self, key: &str, value: &[u8]) -> EngineResult<()> {
        self.ensure_writable()?;
        if key.is_empty() {
            return Err(EngineError::invalid_argument("Empty metadata keys are invalid"));
        }
        if value.is_empty() {
            self.state.metadata.remove(key);
        } else {
            self.state.metadata.insert(key.to_string(), value.to_vec());
        }
        self.dirty = true;
        Ok(())
    }

    /// Swap the in-memory state, used to roll back a transaction
    pub fn restore(&mut self, state: ShardState) {
        self.state = state;
        self.dirty = true;
    }

    /// Write the snapshot if anything changed since the last flush
    pub fn flush(&mut self) -> EngineResult<()> {
        if !self.writable || !self.dirty {
            return Ok(());
        }

        let snapshot = SnapshotOut {
            format_version: FORMAT_VERSION,
            uuid: &self.state.uuid,
            created_at: &self.state.created_at,
            updated_at: Utc::now(),
            last_docid: self.state.last_docid,
            metadata: &self.state.metadata,
            documents: self
                .state
                .documents
                .iter()
                .map(|(id, doc)| (*id, doc.as_ref()))
                .collect(),
        };

        let io_err = |e: std::io::Error| {
            EngineError::new(
                EngineErrorKind::Database,
                format!("Failed to write index at {}: {e}", self.path.display()),
            )
        };

        fs::create_dir_all(&self.path).map_err(io_err)?;
        let json = serde_json::to_string(&snapshot)
            .map_err(|e| EngineError::new(EngineErrorKind::Database, e.to_string()))?;

        // Staged write, then rename over the live snapshot
        let target = Self::snapshot_path(&self.path);
        let staging = self.path.join(format!("{SNAPSHOT_FILE}.tmp"));
        fs::write(&staging, json).map_err(io_err)?;
        fs::rename(&staging, &target).map_err(io_err)?;

        self.dirty = false;
        tracing::debug!(
            path = %self.path.display(),
            docs = self.state.documents.len(),
            "Flushed index shard"
        );
        Ok(())
    }
}

impl Drop for Shard {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(path = %self.path.display(), "Failed to flush index on drop: {e}");
        }
    }
}
