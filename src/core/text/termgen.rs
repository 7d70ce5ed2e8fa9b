//! Index free text into a document.

use super::stemmer::Stemmer;
use super::tokenize;
use crate::core::engine::{Document, TermCount, TermPos};

/// Turns text into postings, tracking the running term position
#[derive(Debug, Clone, Default)]
pub struct TermGenerator {
    stemmer: Stemmer,
    termpos: TermPos,
}

impl TermGenerator {
    pub fn new(stemmer: Stemmer) -> Self {
        Self {
            stemmer,
            termpos: 0,
        }
    }

    pub fn set_stemmer(&mut self, stemmer: Stemmer) {
        self.stemmer = stemmer;
    }

    pub fn stemmer(&self) -> &Stemmer {
        &self.stemmer
    }

    pub fn termpos(&self) -> TermPos {
        self.termpos
    }

    /// Leave a gap so phrases cannot span separately indexed text
    pub fn increase_termpos(&mut self, delta: TermPos) {
        self.termpos = self.termpos.saturating_add(delta);
    }

    /// Index `text`: every word becomes the positional term `prefix+word`,
    /// plus the unpositioned term `Z+prefix+stem(word)` when stemming.
    pub fn index_text(
        &mut self,
        doc: &mut Document,
        text: &str,
        wdf_inc: TermCount,
        prefix: &str,
    ) {
        for word in tokenize(text) {
            self.termpos = self.termpos.saturating_add(1);
            doc.add_posting(&format!("{prefix}{word}"), self.termpos, wdf_inc);
            if !self.stemmer.is_none() {
                let stem = self.stemmer.stem(&word);
                doc.add_term(&format!("Z{prefix}{stem}"), wdf_inc);
            }
        }
    }
}
