//! Text analysis: tokenizing, stemming, indexing free text and parsing
//! free-text queries.
//!
//! Everything is built on tantivy's tokenizer pipeline so that indexing
//! and query parsing split words the same way.

pub mod parser;
pub mod stemmer;
pub mod termgen;

pub use parser::{ParserFlags, QueryParser, StemStrategy};
pub use stemmer::Stemmer;
pub use termgen::TermGenerator;

use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer, TokenStream};

/// Word splitter shared by indexing and query parsing
pub fn analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .build()
}

/// Split `text` into lowercased words
pub fn tokenize(text: &str) -> Vec<String> {
    let mut analyzer = analyzer();
    let mut stream = analyzer.token_stream(text);
    let mut words = Vec::new();
    while stream.advance() {
        words.push(stream.token().text.clone());
    }
    words
}
