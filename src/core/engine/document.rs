//! Documents as stored by the engine.
//!
//! A document carries opaque data, an ordered term list (each term with a
//! within-document frequency and a set of positions) and numbered value
//! slots. Term order is byte-lexicographic and is the order every term
//! list cursor exposes.

use super::encoding;
use super::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Document identifier. 0 means "not assigned".
pub type DocId = u32;

/// Term position within a document (1-based)
pub type TermPos = u32;

/// Within-document frequency and other term counts
pub type TermCount = u32;

/// Value slot number
pub type ValueSlot = u32;

/// Per-term state inside one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    pub wdf: TermCount,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub positions: BTreeSet<TermPos>,
}

impl TermEntry {
    pub fn position_count(&self) -> u32 {
        self.positions.len() as u32
    }
}

/// A document: data, terms and values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(skip)]
    docid: DocId,

    #[serde(with = "encoding::bytes", default)]
    data: Vec<u8>,

    #[serde(default)]
    terms: BTreeMap<String, TermEntry>,

    #[serde(with = "encoding::bytes_map", default)]
    values: BTreeMap<ValueSlot, Vec<u8>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Docid this document was read under, 0 for fresh documents
    pub fn docid(&self) -> DocId {
        self.docid
    }

    pub(crate) fn set_docid(&mut self, docid: DocId) {
        self.docid = docid;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: impl Into<Vec<u8>>) {
        self.data = data.into();
    }

    // ------------------------------------------------------------------
    // Terms
    // ------------------------------------------------------------------

    pub fn term(&self, name: &str) -> Option<&TermEntry> {
        self.terms.get(name)
    }

    pub fn has_term(&self, name: &str) -> bool {
        self.terms.contains_key(name)
    }

    /// Within-document frequency, 0 when the term is absent
    pub fn wdf(&self, name: &str) -> TermCount {
        self.terms.get(name).map(|t| t.wdf).unwrap_or(0)
    }

    /// Terms in native (sorted) order
    pub fn terms(&self) -> impl Iterator<Item = (&String, &TermEntry)> {
        self.terms.iter()
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Document length: the sum of all wdfs
    pub fn length(&self) -> u32 {
        self.terms
            .values()
            .fold(0u32, |acc, t| acc.saturating_add(t.wdf))
    }

    pub fn has_positions(&self) -> bool {
        self.terms.values().any(|t| !t.positions.is_empty())
    }

    /// Add a term or increase its wdf by `wdf_inc`
    pub fn add_term(&mut self, name: &str, wdf_inc: TermCount) {
        let entry = self.terms.entry(name.to_string()).or_default();
        entry.wdf = entry.wdf.saturating_add(wdf_inc);
    }

    /// Insert a term or overwrite its wdf; positions are kept
    pub fn set_term(&mut self, name: &str, wdf: TermCount) {
        self.terms.entry(name.to_string()).or_default().wdf = wdf;
    }

    pub fn remove_term(&mut self, name: &str) -> EngineResult<()> {
        self.terms.remove(name).map(|_| ()).ok_or_else(|| {
            EngineError::invalid_argument(format!("Term '{name}' is not in the document"))
        })
    }

    /// Set the wdf of an existing term without touching its positions
    pub fn set_wdf(&mut self, name: &str, wdf: TermCount) -> EngineResult<()> {
        let entry = self.existing_term_mut(name)?;
        entry.wdf = wdf;
        Ok(())
    }

    /// Decrease the wdf of an existing term (saturating) without touching
    /// its positions
    pub fn decrease_wdf(&mut self, name: &str, delta: TermCount) -> EngineResult<()> {
        let entry = self.existing_term_mut(name)?;
        entry.wdf = entry.wdf.saturating_sub(delta);
        Ok(())
    }

    /// Drop the positions of one term, keeping its wdf
    pub fn clear_term_positions(&mut self, name: &str) -> EngineResult<()> {
        self.existing_term_mut(name)?.positions.clear();
        Ok(())
    }

    pub fn clear_all_positions(&mut self) {
        for entry in self.terms.values_mut() {
            entry.positions.clear();
        }
    }

    pub fn clear_terms(&mut self) {
        self.terms.clear();
    }

    fn existing_term_mut(&mut self, name: &str) -> EngineResult<&mut TermEntry> {
        self.terms.get_mut(name).ok_or_else(|| {
            EngineError::invalid_argument(format!("Term '{name}' is not in the document"))
        })
    }

    // ------------------------------------------------------------------
    // Postings
    // ------------------------------------------------------------------

    pub fn has_posting(&self, name: &str, pos: TermPos) -> bool {
        self.terms
            .get(name)
            .map(|t| t.positions.contains(&pos))
            .unwrap_or(false)
    }

    /// Record `name` at `pos` and increase its wdf by `wdf_inc`
    pub fn add_posting(&mut self, name: &str, pos: TermPos, wdf_inc: TermCount) {
        let entry = self.terms.entry(name.to_string()).or_default();
        entry.positions.insert(pos);
        entry.wdf = entry.wdf.saturating_add(wdf_inc);
    }

    /// Remove one position and decrease the wdf by `wdf_dec` (saturating)
    pub fn remove_posting(
        &mut self,
        name: &str,
        pos: TermPos,
        wdf_dec: TermCount,
    ) -> EngineResult<()> {
        let entry = self.terms.get_mut(name).ok_or_else(|| {
            EngineError::invalid_argument(format!("Term '{name}' is not in the document"))
        })?;
        if !entry.positions.remove(&pos) {
            return Err(EngineError::invalid_argument(format!(
                "Term '{name}' has no position {pos}"
            )));
        }
        entry.wdf = entry.wdf.saturating_sub(wdf_dec);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    /// Value in `slot`, empty when unset
    pub fn value(&self, slot: ValueSlot) -> &[u8] {
        self.values.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_value(&self, slot: ValueSlot) -> bool {
        self.values.contains_key(&slot)
    }

    /// Store a value; an empty value clears the slot
    pub fn add_value(&mut self, slot: ValueSlot, value: impl Into<Vec<u8>>) {
        let value = value.into();
        if value.is_empty() {
            self.values.remove(&slot);
        } else {
            self.values.insert(slot, value);
        }
    }

    pub fn remove_value(&mut self, slot: ValueSlot) -> EngineResult<()> {
        self.values
            .remove(&slot)
            .map(|_| ())
            .ok_or_else(|| EngineError::invalid_argument(format!("Value slot {slot} is empty")))
    }

    pub fn values(&self) -> impl Iterator<Item = (&ValueSlot, &Vec<u8>)> {
        self.values.iter()
    }

    pub fn clear_values(&mut self) {
        self.values.clear();
    }
}
