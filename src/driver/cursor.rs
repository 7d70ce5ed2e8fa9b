//! Query list cursors.
//!
//! A cursor wraps a finite row source (the items of a result set, or a
//! term list) together with the schema used to emit each row. Its size is
//! fixed at creation. Pages can be requested at any offset in any order,
//! and rows can be looked up by key.
//!
//! Every emitted row is prefixed with [`MORE`] and the stream always ends
//! with [`STOP`], so clients never need the row count up front.

use crate::core::engine::{DocId, Document, IndexEngine, MSet, ValueCountMatchSpy};
use crate::driver::codec::{Decoder, Encoder};
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::opcodes::{MORE, STOP};
use crate::driver::schema::{DocumentSchema, TermRow, TermSchema};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Term list of a document, in native (byte) order.
///
/// `freq` is the number of documents in `engine` indexed by the term, or
/// 0 when no database is open.
pub fn document_term_rows(doc: &Document, engine: Option<&dyn IndexEngine>) -> Vec<TermRow> {
    doc.terms()
        .map(|(term, entry)| TermRow {
            term: term.as_bytes().to_vec(),
            wdf: entry.wdf,
            freq: engine.map(|e| e.termfreq(term)).unwrap_or(0),
            positions: entry.positions.iter().copied().collect(),
        })
        .collect()
}

/// Value counts gathered by a spy; `top` keeps only the most frequent
pub fn spy_term_rows(spy: &ValueCountMatchSpy, top: Option<usize>) -> Vec<TermRow> {
    let values = match top {
        Some(max) => spy.top_values(max),
        None => spy.values(),
    };
    values
        .into_iter()
        .map(|(value, count)| TermRow {
            term: value,
            wdf: 0,
            freq: count,
            positions: Vec::new(),
        })
        .collect()
}

#[derive(Debug)]
enum Rows {
    Matches {
        mset: Arc<MSet>,
        schema: DocumentSchema,
    },
    Terms {
        rows: Vec<TermRow>,
        /// Rows are ordered by term, so a single key can be binary searched
        sorted: bool,
        schema: TermSchema,
    },
}

/// Keys of a lookup request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKeys {
    Docids(BTreeSet<DocId>),
    Terms(BTreeSet<Vec<u8>>),
}

impl LookupKeys {
    pub fn len(&self) -> usize {
        match self {
            LookupKeys::Docids(keys) => keys.len(),
            LookupKeys::Terms(keys) => keys.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct Cursor {
    rows: Rows,
}

impl Cursor {
    /// Cursor over the items of a result set
    pub fn over_mset(mset: Arc<MSet>, schema: DocumentSchema) -> Self {
        Self {
            rows: Rows::Matches { mset, schema },
        }
    }

    /// Cursor over term rows already sorted by term
    pub fn over_sorted_terms(rows: Vec<TermRow>, schema: TermSchema) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].term < w[1].term));
        Self {
            rows: Rows::Terms {
                rows,
                sorted: true,
                schema,
            },
        }
    }

    /// Cursor over term rows in some other order
    pub fn over_terms(rows: Vec<TermRow>, schema: TermSchema) -> Self {
        Self {
            rows: Rows::Terms {
                rows,
                sorted: false,
                schema,
            },
        }
    }

    pub fn size(&self) -> u32 {
        match &self.rows {
            Rows::Matches { mset, .. } => mset.size(),
            Rows::Terms { rows, .. } => rows.len() as u32,
        }
    }

    fn emit_row(&self, index: usize, enc: &mut Encoder) {
        match &self.rows {
            Rows::Matches { mset, schema } => {
                if let Some(item) = mset.get(index) {
                    enc.write_u8(MORE);
                    schema.emit_item(item, enc);
                }
            }
            Rows::Terms { rows, schema, .. } => {
                if let Some(row) = rows.get(index) {
                    enc.write_u8(MORE);
                    schema.emit(row, enc);
                }
            }
        }
    }

    /// Emit rows `[from, from + count)`; returns the number written
    pub fn page(&self, from: u32, count: u32, enc: &mut Encoder) -> u32 {
        let size = self.size();
        let end = from.saturating_add(count).min(size);
        let mut written = 0;
        for index in from..end {
            self.emit_row(index as usize, enc);
            written += 1;
        }
        enc.write_u8(STOP);
        written
    }

    /// Read lookup keys in the form this cursor expects: docids ending with
    /// 0, or terms ending with an empty term
    pub fn decode_keys(&self, dec: &mut Decoder<'_>) -> DriverResult<LookupKeys> {
        let keys = match &self.rows {
            Rows::Matches { .. } => {
                let mut keys = BTreeSet::new();
                loop {
                    match dec.read_u32()? {
                        0 => break,
                        docid => keys.insert(docid),
                    };
                }
                LookupKeys::Docids(keys)
            }
            Rows::Terms { .. } => {
                let mut keys = BTreeSet::new();
                loop {
                    let term = dec.read_bytes()?;
                    if term.is_empty() {
                        break;
                    }
                    keys.insert(term);
                }
                LookupKeys::Terms(keys)
            }
        };
        if keys.is_empty() {
            return Err(DriverError::BadArgument(
                "Lookup needs at least one key".to_string(),
            ));
        }
        Ok(keys)
    }

    /// Emit the rows whose key is in `keys`, in source order
    pub fn lookup(&self, keys: &LookupKeys, enc: &mut Encoder) -> DriverResult<u32> {
        let indexes: Vec<usize> = match (&self.rows, keys) {
            (Rows::Matches { mset, .. }, LookupKeys::Docids(docids)) => {
                if docids.len() == 1 {
                    docids
                        .iter()
                        .next()
                        .and_then(|&docid| mset.position_of(docid))
                        .into_iter()
                        .collect()
                } else {
                    mset.items()
                        .iter()
                        .enumerate()
                        .filter(|(_, item)| docids.contains(&item.docid))
                        .map(|(i, _)| i)
                        .collect()
                }
            }
            (Rows::Terms { rows, sorted, .. }, LookupKeys::Terms(terms)) => {
                if terms.len() == 1 {
                    let wanted = terms.iter().next();
                    let found = match wanted {
                        Some(term) if *sorted => rows
                            .binary_search_by(|row| row.term.as_slice().cmp(term.as_slice()))
                            .ok(),
                        Some(term) => rows.iter().position(|row| &row.term == term),
                        None => None,
                    };
                    found.into_iter().collect()
                } else {
                    rows.iter()
                        .enumerate()
                        .filter(|(_, row)| terms.contains(&row.term))
                        .map(|(i, _)| i)
                        .collect()
                }
            }
            _ => {
                return Err(DriverError::BadArgument(
                    "Lookup keys do not match the cursor kind".to_string(),
                ))
            }
        };

        for &index in &indexes {
            self.emit_row(index, enc);
        }
        enc.write_u8(STOP);
        Ok(indexes.len() as u32)
    }
}
