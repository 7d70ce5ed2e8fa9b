//! Snowball stemmers looked up by language name.

use crate::core::engine::{EngineError, EngineResult};
use std::fmt;
use tantivy::tokenizer::{Language, RawTokenizer, Stemmer as SnowballFilter, TextAnalyzer, TokenStream};

/// A stemmer, or the absence of one
#[derive(Clone, Default)]
pub struct Stemmer {
    name: String,
    analyzer: Option<TextAnalyzer>,
}

impl fmt::Debug for Stemmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stemmer").field("name", &self.name).finish()
    }
}

impl PartialEq for Stemmer {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

fn language(name: &str) -> Option<Language> {
    let language = match name {
        "arabic" | "ar" => Language::Arabic,
        "danish" | "da" => Language::Danish,
        "dutch" | "nl" => Language::Dutch,
        "english" | "en" | "porter" => Language::English,
        "finnish" | "fi" => Language::Finnish,
        "french" | "fr" => Language::French,
        "german" | "de" => Language::German,
        "greek" | "el" => Language::Greek,
        "hungarian" | "hu" => Language::Hungarian,
        "italian" | "it" => Language::Italian,
        "norwegian" | "nb" | "nn" | "no" => Language::Norwegian,
        "portuguese" | "pt" => Language::Portuguese,
        "romanian" | "ro" => Language::Romanian,
        "russian" | "ru" => Language::Russian,
        "spanish" | "es" => Language::Spanish,
        "swedish" | "sv" => Language::Swedish,
        "tamil" | "ta" => Language::Tamil,
        "turkish" | "tr" => Language::Turkish,
        _ => return None,
    };
    Some(language)
}

impl Stemmer {
    /// Stemmer for `name`; `""` and `"none"` give a stemmer that does nothing
    pub fn new(name: &str) -> EngineResult<Self> {
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() || name == "none" {
            return Ok(Self::none());
        }
        let lang = language(&name).ok_or_else(|| {
            EngineError::invalid_argument(format!("Language code {name} unknown"))
        })?;
        let analyzer = TextAnalyzer::builder(RawTokenizer::default())
            .filter(SnowballFilter::new(lang))
            .build();
        Ok(Self {
            name,
            analyzer: Some(analyzer),
        })
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.analyzer.is_none()
    }

    /// Language name, empty for no stemming
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stem one lowercased word
    pub fn stem(&self, word: &str) -> String {
        let Some(analyzer) = &self.analyzer else {
            return word.to_string();
        };
        let mut analyzer = analyzer.clone();
        let mut stream = analyzer.token_stream(word);
        let stemmed = if stream.advance() {
            stream.token().text.clone()
        } else {
            word.to_string()
        };
        stemmed
    }
}
