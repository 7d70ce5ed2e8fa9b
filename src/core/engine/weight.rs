//! Weighting schemes.
//!
//! BM25 (default), the older "traditional" probabilistic weight, and a
//! boolean scheme that gives every match weight 0.

use super::document::TermCount;
use std::collections::HashMap;

/// BM25 parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub b: f64,
    pub min_normlen: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.0,
            k2: 0.0,
            k3: 1.0,
            b: 0.5,
            min_normlen: 0.5,
        }
    }
}

/// A weighting scheme
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Weighting {
    Bool,
    Bm25(Bm25Params),
    Trad { k: f64 },
}

impl Default for Weighting {
    fn default() -> Self {
        Weighting::Bm25(Bm25Params::default())
    }
}

/// Collection statistics a weighting scheme needs
#[derive(Debug, Clone, Default)]
pub struct WeightStats {
    pub doccount: u32,
    pub avlength: f64,
    pub query_length: u32,
    pub termfreqs: HashMap<String, u32>,
}

impl WeightStats {
    pub fn termfreq(&self, term: &str) -> u32 {
        self.termfreqs.get(term).copied().unwrap_or(0)
    }

    /// Smoothed inverse document frequency, always positive
    fn idf(&self, termfreq: u32) -> f64 {
        let n = self.doccount as f64;
        let df = termfreq as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn normlen(&self, doclen: u32, floor: f64) -> f64 {
        if self.avlength <= 0.0 {
            return 1.0;
        }
        (doclen as f64 / self.avlength).max(floor)
    }
}

impl Weighting {
    pub fn name(&self) -> &'static str {
        match self {
            Weighting::Bool => "bool_weight",
            Weighting::Bm25(_) => "bm25_weight",
            Weighting::Trad { .. } => "trad_weight",
        }
    }

    /// Contribution of one matching term to a document's weight
    pub fn term_weight(
        &self,
        stats: &WeightStats,
        termfreq: u32,
        wdf: TermCount,
        doclen: u32,
        wqf: TermCount,
    ) -> f64 {
        let wdf = wdf as f64;
        match self {
            Weighting::Bool => 0.0,
            Weighting::Bm25(p) => {
                let normlen = stats.normlen(doclen, p.min_normlen);
                let tf = if p.k1 == 0.0 && p.b == 0.0 {
                    1.0
                } else {
                    (p.k1 + 1.0) * wdf / (p.k1 * ((1.0 - p.b) + p.b * normlen) + wdf)
                };
                stats.idf(termfreq) * tf * query_factor(p.k3, wqf)
            }
            Weighting::Trad { k } => {
                let normlen = stats.normlen(doclen, 0.0);
                let tf = (k + 1.0) * wdf / (k * normlen + wdf);
                stats.idf(termfreq) * tf * wqf.max(1) as f64
            }
        }
    }

    /// Upper bound of [`term_weight`](Self::term_weight) over every document
    pub fn max_term_weight(&self, stats: &WeightStats, termfreq: u32, wqf: TermCount) -> f64 {
        match self {
            Weighting::Bool => 0.0,
            Weighting::Bm25(p) => stats.idf(termfreq) * (p.k1 + 1.0) * query_factor(p.k3, wqf),
            Weighting::Trad { k } => stats.idf(termfreq) * (k + 1.0) * wqf.max(1) as f64,
        }
    }

    /// Per-document component independent of the query terms
    pub fn document_extra(&self, stats: &WeightStats, doclen: u32) -> f64 {
        match self {
            Weighting::Bm25(p) if p.k2 != 0.0 => {
                let normlen = stats.normlen(doclen, p.min_normlen);
                p.k2 * stats.query_length as f64 * (1.0 - normlen) / (1.0 + normlen)
            }
            _ => 0.0,
        }
    }

    /// Upper bound of [`document_extra`](Self::document_extra)
    pub fn max_document_extra(&self, stats: &WeightStats) -> f64 {
        match self {
            Weighting::Bm25(p) if p.k2 != 0.0 => {
                let floor = p.min_normlen;
                p.k2 * stats.query_length as f64 * (1.0 - floor) / (1.0 + floor)
            }
            _ => 0.0,
        }
    }
}

fn query_factor(k3: f64, wqf: TermCount) -> f64 {
    let wqf = wqf.max(1) as f64;
    if k3 == 0.0 {
        1.0
    } else {
        (k3 + 1.0) * wqf / (k3 + wqf)
    }
}
