//! Match spies: observers fed every document a match considers.

use super::document::{Document, ValueSlot};
use super::error::{EngineError, EngineResult};
use std::collections::BTreeMap;

/// Counts the distinct values of one slot across matching documents
#[derive(Debug, Clone, Default)]
pub struct ValueCountMatchSpy {
    slot: ValueSlot,
    counts: BTreeMap<Vec<u8>, u32>,
    total: u32,
    finalized: bool,
}

impl ValueCountMatchSpy {
    pub fn new(slot: ValueSlot) -> Self {
        Self {
            slot,
            ..Self::default()
        }
    }

    pub fn slot(&self) -> ValueSlot {
        self.slot
    }

    /// Number of documents seen
    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Mark the spy as consumed by a match
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    /// Fails when the spy has already been consumed
    pub fn ensure_usable(&self) -> EngineResult<()> {
        if self.finalized {
            return Err(EngineError::invalid_operation(
                "Match spy has already been used by a match",
            ));
        }
        Ok(())
    }

    pub fn observe(&mut self, doc: &Document) {
        self.total += 1;
        let value = doc.value(self.slot);
        if !value.is_empty() {
            *self.counts.entry(value.to_vec()).or_insert(0) += 1;
        }
    }

    /// All values with their counts, sorted by value
    pub fn values(&self) -> Vec<(Vec<u8>, u32)> {
        self.counts.iter().map(|(v, c)| (v.clone(), *c)).collect()
    }

    /// The `max` most frequent values, ties broken by value
    pub fn top_values(&self, max: usize) -> Vec<(Vec<u8>, u32)> {
        let mut all = self.values();
        all.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        all.truncate(max);
        all
    }
}
