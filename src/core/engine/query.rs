//! Query expressions and the document matcher.
//!
//! Matching is a full scan: every candidate document is evaluated against
//! the expression tree, which yields `None` for a miss or the document's
//! weight for a hit.

use super::document::{Document, TermCount, ValueSlot};
use super::weight::{Weighting, WeightStats};
use std::collections::BTreeMap;

/// Boolean and positional combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    And,
    Or,
    AndNot,
    Xor,
    AndMaybe,
    Filter,
    Near,
    Phrase,
    EliteSet,
    Synonym,
}

impl QueryOp {
    pub fn name(self) -> &'static str {
        match self {
            QueryOp::And => "AND",
            QueryOp::Or => "OR",
            QueryOp::AndNot => "AND_NOT",
            QueryOp::Xor => "XOR",
            QueryOp::AndMaybe => "AND_MAYBE",
            QueryOp::Filter => "FILTER",
            QueryOp::Near => "NEAR",
            QueryOp::Phrase => "PHRASE",
            QueryOp::EliteSet => "ELITE_SET",
            QueryOp::Synonym => "SYNONYM",
        }
    }
}

/// A query expression
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Matches every document with weight 0
    MatchAll,
    /// Matches nothing
    MatchNothing,
    Term {
        name: String,
        wqf: TermCount,
        pos: u32,
    },
    Combine {
        op: QueryOp,
        /// Window for NEAR/PHRASE, set size for ELITE_SET
        parameter: u32,
        subqueries: Vec<Query>,
    },
    ValueGe {
        slot: ValueSlot,
        limit: Vec<u8>,
    },
    ValueLe {
        slot: ValueSlot,
        limit: Vec<u8>,
    },
    ValueRange {
        slot: ValueSlot,
        lower: Vec<u8>,
        upper: Vec<u8>,
    },
    Scale {
        factor: f64,
        query: Box<Query>,
    },
}

impl Query {
    pub fn term(name: impl Into<String>) -> Self {
        Query::Term {
            name: name.into(),
            wqf: 1,
            pos: 0,
        }
    }

    pub fn combine(op: QueryOp, subqueries: Vec<Query>) -> Self {
        Query::Combine {
            op,
            parameter: 0,
            subqueries,
        }
    }

    pub fn is_match_nothing(&self) -> bool {
        matches!(self, Query::MatchNothing)
    }

    /// Distinct terms with their summed within-query frequency
    pub fn terms(&self) -> BTreeMap<String, TermCount> {
        let mut out = BTreeMap::new();
        self.collect_terms(&mut out);
        out
    }

    fn collect_terms(&self, out: &mut BTreeMap<String, TermCount>) {
        match self {
            Query::Term { name, wqf, .. } if !name.is_empty() => {
                let entry = out.entry(name.clone()).or_insert(0);
                *entry = entry.saturating_add((*wqf).max(1));
            }
            Query::Combine { subqueries, .. } => {
                for sub in subqueries {
                    sub.collect_terms(out);
                }
            }
            Query::Scale { query, .. } => query.collect_terms(out),
            _ => {}
        }
    }

    /// Evaluate the query against one document
    pub fn evaluate(&self, doc: &Document, scorer: &Scorer<'_>) -> Option<f64> {
        match self {
            Query::MatchAll => Some(0.0),
            Query::MatchNothing => None,
            Query::Term { name, wqf, .. } => {
                if name.is_empty() {
                    return Some(0.0);
                }
                let entry = doc.term(name)?;
                Some(scorer.term_weight(name, entry.wdf, doc.length(), *wqf))
            }
            Query::Combine {
                op,
                parameter,
                subqueries,
            } => evaluate_combination(*op, *parameter, subqueries, doc, scorer),
            Query::ValueGe { slot, limit } => {
                (doc.has_value(*slot) && doc.value(*slot) >= limit.as_slice()).then_some(0.0)
            }
            Query::ValueLe { slot, limit } => {
                (doc.has_value(*slot) && doc.value(*slot) <= limit.as_slice()).then_some(0.0)
            }
            Query::ValueRange { slot, lower, upper } => {
                let value = doc.value(*slot);
                (doc.has_value(*slot) && value >= lower.as_slice() && value <= upper.as_slice())
                    .then_some(0.0)
            }
            Query::Scale { factor, query } => query.evaluate(doc, scorer).map(|w| w * factor),
        }
    }

    /// Positions contributed to a positional match
    fn positions(&self, doc: &Document) -> Vec<u32> {
        match self {
            Query::Term { name, .. } => doc
                .term(name)
                .map(|t| t.positions.iter().copied().collect())
                .unwrap_or_default(),
            Query::Combine {
                op: QueryOp::Or | QueryOp::Synonym | QueryOp::EliteSet,
                subqueries,
                ..
            } => {
                let mut merged: Vec<u32> =
                    subqueries.iter().flat_map(|s| s.positions(doc)).collect();
                merged.sort_unstable();
                merged.dedup();
                merged
            }
            Query::Scale { query, .. } => query.positions(doc),
            _ => Vec::new(),
        }
    }

    /// Upper bound on the weight this query can give one document
    pub fn max_weight(&self, scorer: &Scorer<'_>) -> f64 {
        match self {
            Query::Term { name, wqf, .. } if !name.is_empty() => scorer.max_term_weight(name, *wqf),
            Query::Combine {
                op,
                parameter,
                subqueries,
            } => match op {
                QueryOp::AndNot | QueryOp::Filter => subqueries
                    .first()
                    .map(|q| q.max_weight(scorer))
                    .unwrap_or(0.0),
                QueryOp::EliteSet => elite_set(*parameter, subqueries, scorer)
                    .into_iter()
                    .map(|q| q.max_weight(scorer))
                    .sum(),
                _ => subqueries.iter().map(|q| q.max_weight(scorer)).sum(),
            },
            Query::Scale { factor, query } => query.max_weight(scorer) * factor,
            _ => 0.0,
        }
    }
}

fn evaluate_combination(
    op: QueryOp,
    parameter: u32,
    subqueries: &[Query],
    doc: &Document,
    scorer: &Scorer<'_>,
) -> Option<f64> {
    let (first, rest) = subqueries.split_first()?;
    match op {
        QueryOp::And => subqueries.iter().map(|q| q.evaluate(doc, scorer)).sum(),
        QueryOp::Or | QueryOp::Synonym => {
            let hits: Vec<f64> = subqueries
                .iter()
                .filter_map(|q| q.evaluate(doc, scorer))
                .collect();
            (!hits.is_empty()).then(|| hits.iter().sum())
        }
        QueryOp::EliteSet => {
            let hits: Vec<f64> = elite_set(parameter, subqueries, scorer)
                .into_iter()
                .filter_map(|q| q.evaluate(doc, scorer))
                .collect();
            (!hits.is_empty()).then(|| hits.iter().sum())
        }
        QueryOp::AndNot => {
            let weight = first.evaluate(doc, scorer)?;
            rest.iter()
                .all(|q| q.evaluate(doc, scorer).is_none())
                .then_some(weight)
        }
        QueryOp::Xor => {
            let hits: Vec<f64> = subqueries
                .iter()
                .filter_map(|q| q.evaluate(doc, scorer))
                .collect();
            (hits.len() % 2 == 1).then(|| hits.iter().sum())
        }
        QueryOp::AndMaybe => {
            let weight = first.evaluate(doc, scorer)?;
            Some(
                weight
                    + rest
                        .iter()
                        .filter_map(|q| q.evaluate(doc, scorer))
                        .sum::<f64>(),
            )
        }
        QueryOp::Filter => {
            let weight = first.evaluate(doc, scorer)?;
            rest.iter()
                .all(|q| q.evaluate(doc, scorer).is_some())
                .then_some(weight)
        }
        QueryOp::Near | QueryOp::Phrase => {
            let weight: f64 = subqueries.iter().map(|q| q.evaluate(doc, scorer)).sum::<Option<f64>>()?;
            let window = if parameter == 0 {
                subqueries.len() as u32
            } else {
                parameter
            };
            let lists: Vec<Vec<u32>> = subqueries.iter().map(|q| q.positions(doc)).collect();
            let found = if op == QueryOp::Near {
                near_match(&lists, window)
            } else {
                phrase_match(&lists, window)
            };
            found.then_some(weight)
        }
    }
}

/// The `size` subqueries with the highest maximum weight, in query order.
/// Size 0 keeps them all; ties go to the earlier subquery.
fn elite_set<'q>(size: u32, subqueries: &'q [Query], scorer: &Scorer<'_>) -> Vec<&'q Query> {
    let size = size as usize;
    if size == 0 || size >= subqueries.len() {
        return subqueries.iter().collect();
    }
    let mut ranked: Vec<(usize, f64)> = subqueries
        .iter()
        .map(|q| q.max_weight(scorer))
        .enumerate()
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let mut keep: Vec<usize> = ranked.into_iter().take(size).map(|(i, _)| i).collect();
    keep.sort_unstable();
    keep.into_iter().map(|i| &subqueries[i]).collect()
}

/// True when one position from every list fits inside `window`
fn near_match(lists: &[Vec<u32>], window: u32) -> bool {
    if lists.iter().any(Vec::is_empty) {
        return false;
    }
    let mut merged: Vec<(u32, usize)> = lists
        .iter()
        .enumerate()
        .flat_map(|(i, l)| l.iter().map(move |&p| (p, i)))
        .collect();
    merged.sort_unstable();

    let mut counts = vec![0usize; lists.len()];
    let mut covered = 0;
    let mut start = 0;
    for end in 0..merged.len() {
        let (_, idx) = merged[end];
        if counts[idx] == 0 {
            covered += 1;
        }
        counts[idx] += 1;

        while covered == lists.len() {
            if merged[end].0 - merged[start].0 < window {
                return true;
            }
            let (_, left) = merged[start];
            counts[left] -= 1;
            if counts[left] == 0 {
                covered -= 1;
            }
            start += 1;
        }
    }
    false
}

/// True when the lists have strictly increasing positions, in order,
/// spanning less than `window`
fn phrase_match(lists: &[Vec<u32>], window: u32) -> bool {
    let Some((head, tail)) = lists.split_first() else {
        return false;
    };
    'starts: for &start in head {
        let mut last = start;
        for list in tail {
            match list.iter().find(|&&p| p > last) {
                Some(&p) => last = p,
                None => continue 'starts,
            }
        }
        if last - start < window {
            return true;
        }
    }
    false
}

/// Scoring context for one match run
pub struct Scorer<'a> {
    pub weighting: &'a Weighting,
    pub stats: &'a WeightStats,
}

impl Scorer<'_> {
    pub fn term_weight(&self, term: &str, wdf: TermCount, doclen: u32, wqf: TermCount) -> f64 {
        self.weighting
            .term_weight(self.stats, self.stats.termfreq(term), wdf, doclen, wqf)
    }

    pub fn max_term_weight(&self, term: &str, wqf: TermCount) -> f64 {
        self.weighting
            .max_term_weight(self.stats, self.stats.termfreq(term), wqf)
    }
}
