//! Enquire sessions and match sets.
//!
//! An [`Enquire`] holds the query and match options; running it against an
//! engine produces an immutable [`MSet`] snapshot that result-set cursors
//! and statistics requests read from.

use super::document::{DocId, Document, ValueSlot};
use super::error::{EngineError, EngineResult};
use super::query::{Query, Scorer};
use super::spy::ValueCountMatchSpy;
use super::weight::{WeightStats, Weighting};
use super::{Candidate, IndexEngine};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds sort keys from several value slots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiValueKeyMaker {
    slots: Vec<(ValueSlot, bool)>,
}

impl MultiValueKeyMaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slot; `reverse` sorts that component descending
    pub fn add_value(&mut self, slot: ValueSlot, reverse: bool) {
        self.slots.push((slot, reverse));
    }

    pub fn slots(&self) -> &[(ValueSlot, bool)] {
        &self.slots
    }

    /// Compare two documents component by component
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for &(slot, reverse) in &self.slots {
            let ord = a.value(slot).cmp(b.value(slot));
            let ord = if reverse { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// Document ordering used to rank a match
#[derive(Debug, Clone, PartialEq)]
pub enum SortOrder {
    Relevance,
    Value {
        slot: ValueSlot,
        reverse: bool,
    },
    ValueThenRelevance {
        slot: ValueSlot,
        reverse: bool,
    },
    RelevanceThenValue {
        slot: ValueSlot,
        reverse: bool,
    },
    Key {
        maker: Arc<MultiValueKeyMaker>,
        reverse: bool,
    },
    KeyThenRelevance {
        maker: Arc<MultiValueKeyMaker>,
        reverse: bool,
    },
    RelevanceThenKey {
        maker: Arc<MultiValueKeyMaker>,
        reverse: bool,
    },
}

/// Tie-breaking order on docids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocidOrder {
    #[default]
    Ascending,
    Descending,
    DontCare,
}

/// Query plus match options
#[derive(Debug, Clone)]
pub struct Enquire {
    query: Query,
    query_length: u32,
    sort: SortOrder,
    docid_order: DocidOrder,
    weighting: Weighting,
    percent_cutoff: u8,
    weight_cutoff: f64,
    collapse: Option<(ValueSlot, u32)>,
}

impl Default for Enquire {
    fn default() -> Self {
        Self {
            query: Query::MatchNothing,
            query_length: 0,
            sort: SortOrder::Relevance,
            docid_order: DocidOrder::Ascending,
            weighting: Weighting::default(),
            percent_cutoff: 0,
            weight_cutoff: 0.0,
            collapse: None,
        }
    }
}

impl Enquire {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query; a `query_length` of 0 uses the number of query terms
    pub fn set_query(&mut self, query: Query, query_length: u32) {
        self.query = query;
        self.query_length = query_length;
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
    }

    pub fn set_docid_order(&mut self, order: DocidOrder) {
        self.docid_order = order;
    }

    pub fn set_weighting(&mut self, weighting: Weighting) {
        self.weighting = weighting;
    }

    pub fn set_cutoff(&mut self, percent: u8, weight: f64) {
        self.percent_cutoff = percent;
        self.weight_cutoff = weight;
    }

    /// Keep at most `max` documents per value of `slot`
    pub fn set_collapse_key(&mut self, slot: ValueSlot, max: u32) {
        self.collapse = Some((slot, max.max(1)));
    }

    pub fn clear_collapse_key(&mut self) {
        self.collapse = None;
    }

    /// Statistics for the current query against `engine`
    fn stats(&self, engine: &dyn IndexEngine) -> WeightStats {
        let terms = self.query.terms();
        let query_length = if self.query_length == 0 {
            terms.values().sum()
        } else {
            self.query_length
        };
        WeightStats {
            doccount: engine.doccount(),
            avlength: engine.avlength(),
            query_length,
            termfreqs: terms
                .keys()
                .map(|t| (t.clone(), engine.termfreq(t)))
                .collect(),
        }
    }

    /// Run the match and return items `[first, first + maxitems)`
    pub fn get_mset(
        &self,
        engine: &dyn IndexEngine,
        first: u32,
        maxitems: u32,
        spies: &mut [&mut ValueCountMatchSpy],
    ) -> EngineResult<MSet> {
        for spy in spies.iter() {
            spy.ensure_usable()?;
        }

        let stats = self.stats(engine);
        let scorer = Scorer {
            weighting: &self.weighting,
            stats: &stats,
        };

        let mut hits: Vec<Hit> = Vec::new();
        for candidate in engine.candidates() {
            if let Some(weight) = self.query.evaluate(&candidate.document, &scorer) {
                let extra = self
                    .weighting
                    .document_extra(&stats, candidate.document.length());
                for spy in spies.iter_mut() {
                    spy.observe(&candidate.document);
                }
                hits.push(Hit {
                    candidate,
                    weight: weight + extra,
                    collapse_count: 0,
                });
            }
        }
        for spy in spies.iter_mut() {
            spy.finalize();
        }

        let max_attained = hits.iter().map(|h| h.weight).fold(0.0, f64::max);

        if self.percent_cutoff > 0 {
            // Same rounding as the percent reported for each item
            hits.retain(|h| percent(h.weight, max_attained) >= self.percent_cutoff);
        }
        if self.weight_cutoff > 0.0 {
            hits.retain(|h| h.weight >= self.weight_cutoff);
        }

        hits.sort_by(|a, b| self.compare(a, b));
        let uncollapsed = hits.len() as u32;

        if let Some((slot, max)) = self.collapse {
            hits = collapse(hits, slot, max);
        }
        let matches = hits.len() as u32;

        let termweights: HashMap<String, f64> = self
            .query
            .terms()
            .into_iter()
            .map(|(term, wqf)| {
                let w = scorer.max_term_weight(&term, wqf);
                (term, w)
            })
            .collect();
        let max_possible = (self.query.max_weight(&scorer)
            + self.weighting.max_document_extra(&stats))
        .max(max_attained);

        let items = hits
            .into_iter()
            .enumerate()
            .skip(first as usize)
            .take(maxitems as usize)
            .map(|(rank, hit)| MSetItem {
                docid: hit.candidate.docid,
                sub_docid: hit.candidate.sub_docid,
                db_number: hit.candidate.db_number,
                weight: hit.weight,
                percent: percent(hit.weight, max_attained),
                rank: rank as u32,
                collapse_count: hit.collapse_count,
                document: hit.candidate.document,
            })
            .collect::<Vec<_>>();
        let positions = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.docid, i))
            .collect();

        Ok(MSet {
            first,
            items,
            positions,
            matches_lower_bound: matches,
            matches_estimated: matches,
            matches_upper_bound: matches,
            uncollapsed_lower_bound: uncollapsed,
            uncollapsed_estimated: uncollapsed,
            uncollapsed_upper_bound: uncollapsed,
            max_possible,
            max_attained,
            termweights,
            termfreqs: stats.termfreqs,
        })
    }

    fn compare(&self, a: &Hit, b: &Hit) -> Ordering {
        let relevance = b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal);
        let by_value = |slot: ValueSlot, reverse: bool| {
            let ord = a
                .candidate
                .document
                .value(slot)
                .cmp(b.candidate.document.value(slot));
            if reverse {
                ord.reverse()
            } else {
                ord
            }
        };
        let by_key = |maker: &MultiValueKeyMaker, reverse: bool| {
            let ord = maker.compare(&a.candidate.document, &b.candidate.document);
            if reverse {
                ord.reverse()
            } else {
                ord
            }
        };

        let primary = match &self.sort {
            SortOrder::Relevance => relevance,
            SortOrder::Value { slot, reverse } => by_value(*slot, *reverse),
            SortOrder::ValueThenRelevance { slot, reverse } => {
                by_value(*slot, *reverse).then(relevance)
            }
            SortOrder::RelevanceThenValue { slot, reverse } => {
                relevance.then_with(|| by_value(*slot, *reverse))
            }
            SortOrder::Key { maker, reverse } => by_key(maker, *reverse),
            SortOrder::KeyThenRelevance { maker, reverse } => {
                by_key(maker, *reverse).then(relevance)
            }
            SortOrder::RelevanceThenKey { maker, reverse } => {
                relevance.then_with(|| by_key(maker, *reverse))
            }
        };

        primary.then_with(|| match self.docid_order {
            DocidOrder::Descending => b.candidate.docid.cmp(&a.candidate.docid),
            DocidOrder::Ascending | DocidOrder::DontCare => {
                a.candidate.docid.cmp(&b.candidate.docid)
            }
        })
    }
}

struct Hit {
    candidate: Candidate,
    weight: f64,
    collapse_count: u32,
}

/// Drop documents beyond the first `max` per collapse value; the count of
/// removed documents is credited to the best-ranked survivor
fn collapse(hits: Vec<Hit>, slot: ValueSlot, max: u32) -> Vec<Hit> {
    let mut kept: Vec<Hit> = Vec::with_capacity(hits.len());
    let mut seen: HashMap<Vec<u8>, (usize, u32)> = HashMap::new();
    for hit in hits {
        let key = hit.candidate.document.value(slot).to_vec();
        if key.is_empty() {
            kept.push(hit);
            continue;
        }
        match seen.get_mut(&key) {
            Some((first_index, count)) if *count >= max => {
                kept[*first_index].collapse_count += 1;
            }
            Some((_, count)) => {
                *count += 1;
                kept.push(hit);
            }
            None => {
                seen.insert(key, (kept.len(), 1));
                kept.push(hit);
            }
        }
    }
    kept
}

fn percent(weight: f64, max_attained: f64) -> u8 {
    if max_attained <= 0.0 {
        return 100;
    }
    (100.0 * weight / max_attained).round().clamp(0.0, 100.0) as u8
}

/// One ranked match
#[derive(Debug, Clone)]
pub struct MSetItem {
    /// Docid across all open shards
    pub docid: DocId,
    /// Docid inside its own shard
    pub sub_docid: DocId,
    /// Zero-based shard number
    pub db_number: u32,
    pub weight: f64,
    pub percent: u8,
    pub rank: u32,
    pub collapse_count: u32,
    pub document: Arc<Document>,
}

/// Snapshot of one match
#[derive(Debug, Clone, Default)]
pub struct MSet {
    first: u32,
    items: Vec<MSetItem>,
    /// Item index by multi-db docid
    positions: HashMap<DocId, usize>,
    pub matches_lower_bound: u32,
    pub matches_estimated: u32,
    pub matches_upper_bound: u32,
    pub uncollapsed_lower_bound: u32,
    pub uncollapsed_estimated: u32,
    pub uncollapsed_upper_bound: u32,
    pub max_possible: f64,
    pub max_attained: f64,
    termweights: HashMap<String, f64>,
    termfreqs: HashMap<String, u32>,
}

impl MSet {
    pub fn items(&self) -> &[MSetItem] {
        &self.items
    }

    pub fn size(&self) -> u32 {
        self.items.len() as u32
    }

    /// Rank of the first item
    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn get(&self, index: usize) -> Option<&MSetItem> {
        self.items.get(index)
    }

    /// Index of the item with multi-db docid `docid`
    pub fn position_of(&self, docid: DocId) -> Option<usize> {
        self.positions.get(&docid).copied()
    }

    pub fn termweight(&self, term: &str) -> EngineResult<f64> {
        self.termweights.get(term).copied().ok_or_else(|| {
            EngineError::invalid_argument(format!("Term weight of '{term}' not available"))
        })
    }

    pub fn termfreq(&self, term: &str) -> EngineResult<u32> {
        self.termfreqs.get(term).copied().ok_or_else(|| {
            EngineError::invalid_argument(format!(
                "Term frequency of '{term}' not available"
            ))
        })
    }
}
