//! The embedded engine behind every session.
//!
//! Either one writable shard, or any number of read-only shards searched
//! together. With `n` shards open, document `sub` of shard `i` (zero
//! based) is seen as docid `(sub - 1) * n + i + 1`.

use super::document::{DocId, Document, ValueSlot};
use super::error::{EngineError, EngineErrorKind, EngineResult};
use super::shard::{Shard, ShardState};
use super::{Candidate, DatabaseState, IndexEngine, OpenMode, RemoteSpec};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory-backed engine
#[derive(Debug)]
pub struct LocalEngine {
    data_dir: PathBuf,
    flush_on_commit: bool,
    shards: Vec<Shard>,
    writable: bool,
    transaction: Option<ShardState>,
}

impl LocalEngine {
    /// Relative index paths resolve against `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>, flush_on_commit: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            flush_on_commit,
            shards: Vec::new(),
            writable: false,
            transaction: None,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    fn to_multi(&self, shard: usize, sub: DocId) -> DocId {
        let n = self.shards.len() as u32;
        (sub - 1) * n + shard as u32 + 1
    }

    fn to_sub(&self, docid: DocId) -> Option<(usize, DocId)> {
        let n = self.shards.len() as u32;
        if n == 0 || docid == 0 {
            return None;
        }
        Some((((docid - 1) % n) as usize, (docid - 1) / n + 1))
    }

    fn writable_shard(&mut self) -> EngineResult<&mut Shard> {
        if !self.writable {
            return Err(EngineError::invalid_operation(
                "No index is open for writing",
            ));
        }
        self.shards.first_mut().ok_or_else(EngineError::no_database)
    }

    fn all_documents(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.shards.iter().flat_map(|s| s.documents().values())
    }

    /// Present `doc` under its multi-shard docid
    fn as_multi(&self, shard: usize, doc: &Arc<Document>) -> Arc<Document> {
        if self.shards.len() == 1 {
            return Arc::clone(doc);
        }
        let mut copy = Document::clone(doc);
        copy.set_docid(self.to_multi(shard, doc.docid()));
        Arc::new(copy)
    }
}

impl IndexEngine for LocalEngine {
    fn state(&self) -> DatabaseState {
        if self.shards.is_empty() {
            DatabaseState::Closed
        } else if self.writable {
            DatabaseState::Writable
        } else {
            DatabaseState::ReadOnly
        }
    }

    fn open(&mut self, mode: OpenMode, path: &Path) -> EngineResult<()> {
        let dir = self.resolve(path);
        if mode == OpenMode::Read {
            if self.writable {
                return Err(EngineError::invalid_operation(
                    "Cannot add a read-only index while an index is open for writing",
                ));
            }
            let shard = Shard::open(&dir, mode)?;
            self.shards.push(shard);
            tracing::info!(path = %dir.display(), shards = self.shards.len(), "Opened index for reading");
            return Ok(());
        }

        self.close()?;
        let shard = Shard::open(&dir, mode)?;
        self.shards.push(shard);
        self.writable = true;
        tracing::info!(path = %dir.display(), ?mode, "Opened index for writing");
        Ok(())
    }

    fn open_remote(&mut self, mode: OpenMode, remote: &RemoteSpec) -> EngineResult<()> {
        let target = match remote {
            RemoteSpec::Program { program, args, .. } => format!("prog {program} {args}"),
            RemoteSpec::Tcp { host, port, .. } => format!("tcp {host}:{port}"),
        };
        tracing::warn!(%target, ?mode, "Remote backends are not available");
        Err(EngineError::new(
            EngineErrorKind::FeatureUnavailable,
            format!("Remote backend not supported: {target}"),
        ))
    }

    fn close(&mut self) -> EngineResult<()> {
        // An uncommitted transaction is discarded, never flushed
        if let Some(backup) = self.transaction.take() {
            if let Ok(shard) = self.writable_shard() {
                shard.restore(backup);
                tracing::debug!("Open transaction discarded on close");
            }
        }
        let mut first_err = None;
        for shard in &mut self.shards {
            if let Err(e) = shard.flush() {
                first_err.get_or_insert(e);
            }
        }
        if !self.shards.is_empty() {
            tracing::info!(shards = self.shards.len(), "Closed index");
        }
        self.shards.clear();
        self.writable = false;
        first_err.map_or(Ok(()), Err)
    }

    fn doccount(&self) -> u32 {
        self.shards.iter().map(|s| s.documents().len() as u32).sum()
    }

    fn last_docid(&self) -> DocId {
        self.shards
            .iter()
            .enumerate()
            .filter(|(_, s)| s.last_docid() > 0)
            .map(|(i, s)| self.to_multi(i, s.last_docid()))
            .max()
            .unwrap_or(0)
    }

    fn avlength(&self) -> f64 {
        let count = self.doccount();
        if count == 0 {
            return 0.0;
        }
        let total: u64 = self.all_documents().map(|d| d.length() as u64).sum();
        total as f64 / count as f64
    }

    fn has_positions(&self) -> bool {
        self.all_documents().any(|d| d.has_positions())
    }

    fn termfreq(&self, term: &str) -> u32 {
        self.all_documents().filter(|d| d.has_term(term)).count() as u32
    }

    fn collection_freq(&self, term: &str) -> u32 {
        self.all_documents().map(|d| d.wdf(term)).sum()
    }

    fn value_freq(&self, slot: ValueSlot) -> u32 {
        self.all_documents().filter(|d| d.has_value(slot)).count() as u32
    }

    fn value_lower_bound(&self, slot: ValueSlot) -> Vec<u8> {
        self.all_documents()
            .filter(|d| d.has_value(slot))
            .map(|d| d.value(slot))
            .min()
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }

    fn value_upper_bound(&self, slot: ValueSlot) -> Vec<u8> {
        self.all_documents()
            .map(|d| d.value(slot))
            .max()
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }

    fn doclength_lower_bound(&self) -> u32 {
        self.all_documents().map(|d| d.length()).min().unwrap_or(0)
    }

    fn doclength_upper_bound(&self) -> u32 {
        self.all_documents().map(|d| d.length()).max().unwrap_or(0)
    }

    fn wdf_upper_bound(&self, term: &str) -> u32 {
        self.all_documents().map(|d| d.wdf(term)).max().unwrap_or(0)
    }

    fn doclength(&self, docid: DocId) -> EngineResult<u32> {
        Ok(self.document(docid)?.length())
    }

    fn uuid(&self) -> String {
        self.shards
            .iter()
            .map(Shard::uuid)
            .collect::<Vec<_>>()
            .join(":")
    }

    fn metadata(&self, key: &str) -> Vec<u8> {
        self.shards
            .first()
            .map(|s| s.metadata(key))
            .unwrap_or_default()
    }

    fn terms_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut terms = BTreeSet::new();
        for doc in self.all_documents() {
            for (term, _) in doc.terms() {
                if term.starts_with(prefix) {
                    terms.insert(term.clone());
                }
            }
        }
        terms.into_iter().collect()
    }

    fn document(&self, docid: DocId) -> EngineResult<Arc<Document>> {
        if self.shards.is_empty() {
            return Err(EngineError::no_database());
        }
        let (index, sub) = self
            .to_sub(docid)
            .ok_or_else(|| EngineError::invalid_argument("Document ID 0 is invalid"))?;
        let doc = self.shards[index]
            .document(sub)
            .ok_or_else(|| EngineError::doc_not_found(docid))?;
        Ok(self.as_multi(index, doc))
    }

    fn postlist(&self, term: &str) -> Vec<DocId> {
        let mut docids: Vec<DocId> = self
            .shards
            .iter()
            .enumerate()
            .flat_map(|(i, shard)| {
                shard
                    .documents()
                    .iter()
                    .filter(|(_, d)| d.has_term(term))
                    .map(move |(sub, _)| (i, *sub))
            })
            .map(|(i, sub)| self.to_multi(i, sub))
            .collect();
        docids.sort_unstable();
        docids
    }

    fn candidates(&self) -> Vec<Candidate> {
        let mut out = Vec::with_capacity(self.doccount() as usize);
        for (i, shard) in self.shards.iter().enumerate() {
            for (sub, doc) in shard.documents() {
                out.push(Candidate {
                    docid: self.to_multi(i, *sub),
                    db_number: i as u32,
                    sub_docid: *sub,
                    document: self.as_multi(i, doc),
                });
            }
        }
        out
    }

    fn add_document(&mut self, doc: Document) -> EngineResult<DocId> {
        self.writable_shard()?.add(doc)
    }

    fn replace_document(&mut self, docid: DocId, doc: Document) -> EngineResult<()> {
        self.writable_shard()?.insert(docid, doc)
    }

    fn replace_document_by_term(&mut self, term: &str, doc: Document) -> EngineResult<DocId> {
        let matches = self.postlist(term);
        let shard = self.writable_shard()?;
        match matches.split_first() {
            None => shard.add(doc),
            Some((&first, rest)) => {
                shard.insert(first, doc)?;
                for &docid in rest {
                    shard.remove(docid)?;
                }
                Ok(first)
            }
        }
    }

    fn delete_document(&mut self, docid: DocId) -> EngineResult<()> {
        self.writable_shard()?.remove(docid)
    }

    fn delete_documents_by_term(&mut self, term: &str) -> EngineResult<()> {
        let matches = self.postlist(term);
        let shard = self.writable_shard()?;
        for docid in matches {
            shard.remove(docid)?;
        }
        Ok(())
    }

    fn set_metadata(&mut self, key: &str, value: &[u8]) -> EngineResult<()> {
        self.writable_shard()?.set_metadata(key, value)
    }

    fn begin_transaction(&mut self) -> EngineResult<()> {
        if self.transaction.is_some() {
            return Err(EngineError::invalid_operation(
                "Cannot begin a transaction inside a transaction",
            ));
        }
        let backup = self.writable_shard()?.state.clone();
        self.transaction = Some(backup);
        Ok(())
    }

    fn cancel_transaction(&mut self) -> EngineResult<()> {
        let backup = self
            .transaction
            .take()
            .ok_or_else(|| EngineError::invalid_operation("No transaction is in progress"))?;
        self.writable_shard()?.restore(backup);
        tracing::debug!("Transaction cancelled");
        Ok(())
    }

    fn commit_transaction(&mut self) -> EngineResult<()> {
        if self.transaction.take().is_none() {
            return Err(EngineError::invalid_operation(
                "No transaction is in progress",
            ));
        }
        let flush = self.flush_on_commit;
        let shard = self.writable_shard()?;
        if flush {
            shard.flush()?;
        }
        tracing::debug!("Transaction committed");
        Ok(())
    }
}

impl Drop for LocalEngine {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close index on drop: {e}");
        }
    }
}
