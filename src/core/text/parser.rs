//! Free-text query parser.
//!
//! Supported syntax, each part switched on by a [`ParserFlags`] bit:
//! - `AND`, `OR`, `NOT`, `XOR` and brackets (BOOLEAN, any case with
//!   BOOLEAN_ANY_CASE)
//! - `"quoted phrases"` (PHRASE)
//! - `+required` and `-excluded` words (LOVEHATE)
//! - `prefix*` wildcards (WILDCARD) and a trailing partial word (PARTIAL)
//! - a leading `NOT` or only `-excluded` words (PURE_NOT)
//! - `field:word` for registered free-text and boolean fields
//!
//! A query that fails to parse is retried once with the boolean, phrase
//! and love/hate syntax switched off.

use super::stemmer::Stemmer;
use super::tokenize;
use bitflags::bitflags;
use crate::core::engine::{EngineError, EngineErrorKind, EngineResult, IndexEngine, Query, QueryOp};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static FIELD_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9_]*):(.*)$").unwrap());

bitflags! {
    /// Parser feature switches
    ///
    /// Bit `n` is the feature with wire id `n + 1`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParserFlags: u32 {
        const BOOLEAN = 1 << 0;
        const PHRASE = 1 << 1;
        const LOVEHATE = 1 << 2;
        const BOOLEAN_ANY_CASE = 1 << 3;
        const WILDCARD = 1 << 4;
        const PURE_NOT = 1 << 5;
        const PARTIAL = 1 << 6;
        /// Accepted; no spelling data exists
        const SPELLING_CORRECTION = 1 << 7;
        const SYNONYM = 1 << 8;
        const AUTO_SYNONYMS = 1 << 9;
        const AUTO_MULTIWORD_SYNONYMS = 1 << 10;
        const DEFAULT = Self::BOOLEAN.bits() | Self::PHRASE.bits() | Self::LOVEHATE.bits();
    }
}

/// Which query words get stemmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StemStrategy {
    None,
    /// Stem words that do not start with a capital, as `Z`-prefixed terms
    #[default]
    Some,
    /// Stem every word, without a `Z` prefix
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldInfo {
    boolean: bool,
    exclusive: bool,
    prefixes: Vec<String>,
}

/// Parser configuration; cheap to clone for per-query customization
#[derive(Debug, Clone)]
pub struct QueryParser {
    stemmer: Stemmer,
    strategy: StemStrategy,
    default_op: QueryOp,
    max_wildcard_expansion: u32,
    fields: BTreeMap<String, FieldInfo>,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self {
            stemmer: Stemmer::none(),
            strategy: StemStrategy::Some,
            default_op: QueryOp::Or,
            max_wildcard_expansion: 0,
            fields: BTreeMap::new(),
        }
    }
}

impl QueryParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stemmer(&mut self, stemmer: Stemmer) {
        self.stemmer = stemmer;
    }

    pub fn stemmer(&self) -> &Stemmer {
        &self.stemmer
    }

    pub fn set_stemming_strategy(&mut self, strategy: StemStrategy) {
        self.strategy = strategy;
    }

    /// 0 means no limit
    pub fn set_max_wildcard_expansion(&mut self, max: u32) {
        self.max_wildcard_expansion = max;
    }

    pub fn set_default_op(&mut self, op: QueryOp) -> EngineResult<()> {
        match op {
            QueryOp::And
            | QueryOp::Or
            | QueryOp::Near
            | QueryOp::Phrase
            | QueryOp::EliteSet
            | QueryOp::Synonym => {
                self.default_op = op;
                Ok(())
            }
            other => Err(EngineError::invalid_argument(format!(
                "{} is not a valid default operator",
                other.name()
            ))),
        }
    }

    pub fn default_op(&self) -> QueryOp {
        self.default_op
    }

    /// Map `field:` onto free-text terms starting with `prefix`
    pub fn add_prefix(&mut self, field: &str, prefix: &str) -> EngineResult<()> {
        self.add_field(field, prefix, false, false)
    }

    /// Map `field:` onto boolean filter terms starting with `prefix`
    pub fn add_boolean_prefix(
        &mut self,
        field: &str,
        prefix: &str,
        exclusive: bool,
    ) -> EngineResult<()> {
        self.add_field(field, prefix, true, exclusive)
    }

    fn add_field(
        &mut self,
        field: &str,
        prefix: &str,
        boolean: bool,
        exclusive: bool,
    ) -> EngineResult<()> {
        match self.fields.get_mut(field) {
            Some(info) if info.boolean != boolean => Err(EngineError::invalid_operation(format!(
                "Can't use add_prefix() and add_boolean_prefix() on the same field name '{field}'"
            ))),
            Some(info) => {
                if !info.prefixes.iter().any(|p| p == prefix) {
                    info.prefixes.push(prefix.to_string());
                }
                info.exclusive = exclusive;
                Ok(())
            }
            None => {
                self.fields.insert(
                    field.to_string(),
                    FieldInfo {
                        boolean,
                        exclusive,
                        prefixes: vec![prefix.to_string()],
                    },
                );
                Ok(())
            }
        }
    }

    /// Parse `text`; unprefixed words get `default_prefix`.
    ///
    /// The engine, when given, is used to expand wildcards. An empty query
    /// matches nothing.
    pub fn parse_query(
        &self,
        text: &str,
        flags: ParserFlags,
        default_prefix: &str,
        engine: Option<&dyn IndexEngine>,
    ) -> EngineResult<Query> {
        match self.parse_with(text, flags, default_prefix, engine) {
            Err(e) if e.kind == EngineErrorKind::QueryParser => {
                let mut relaxed = flags;
                relaxed.remove(ParserFlags::BOOLEAN | ParserFlags::PHRASE | ParserFlags::LOVEHATE);
                if relaxed == flags {
                    return Err(e);
                }
                tracing::debug!(query = text, "Reparsing query without operators: {e}");
                self.parse_with(text, relaxed, default_prefix, engine)
            }
            other => other,
        }
    }

    fn parse_with(
        &self,
        text: &str,
        flags: ParserFlags,
        default_prefix: &str,
        engine: Option<&dyn IndexEngine>,
    ) -> EngineResult<Query> {
        let tokens = self.lex(text, flags);
        let mut state = ParseState {
            parser: self,
            flags,
            default_prefix,
            engine,
            tokens,
            pos: 0,
        };
        let query = state.parse_or()?;
        if state.pos < state.tokens.len() {
            return Err(syntax_error("unmatched ')'"));
        }
        Ok(query.unwrap_or(Query::MatchNothing))
    }

    fn lex(&self, text: &str, flags: ParserFlags) -> Vec<Token> {
        let boolean = flags.contains(ParserFlags::BOOLEAN);
        let phrase = flags.contains(ParserFlags::PHRASE);
        let lovehate = flags.contains(ParserFlags::LOVEHATE);
        let chars: Vec<char> = text.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            if boolean && (c == '(' || c == ')') {
                tokens.push(if c == '(' { Token::Open } else { Token::Close });
                i += 1;
                continue;
            }
            if lovehate && (c == '+' || c == '-') {
                if let Some(next) = chars.get(i + 1) {
                    if !next.is_whitespace() {
                        tokens.push(if c == '+' { Token::Love } else { Token::Hate });
                        i += 1;
                        continue;
                    }
                }
            }
            if phrase && c == '"' {
                let (body, next) = read_quoted(&chars, i + 1);
                tokens.push(Token::Phrase { field: None, text: body });
                i = next;
                continue;
            }

            let start = i;
            while i < chars.len()
                && !chars[i].is_whitespace()
                && !(boolean && (chars[i] == '(' || chars[i] == ')'))
                && !(phrase && chars[i] == '"')
            {
                i += 1;
            }
            let chunk: String = chars[start..i].iter().collect();
            let at_end = i == chars.len();

            if let Some(caps) = FIELD_PREFIX.captures(&chunk) {
                let field = &caps[1];
                let rest = &caps[2];
                if self.fields.contains_key(field) {
                    if rest.is_empty() && phrase && chars.get(i) == Some(&'"') {
                        let (body, next) = read_quoted(&chars, i + 1);
                        tokens.push(Token::Phrase {
                            field: Some(field.to_string()),
                            text: body,
                        });
                        i = next;
                        continue;
                    }
                    if !rest.is_empty() {
                        tokens.push(word_token(Some(field.to_string()), rest, flags, at_end));
                        continue;
                    }
                }
            }

            if boolean {
                let op = if flags.contains(ParserFlags::BOOLEAN_ANY_CASE) {
                    chunk.to_ascii_uppercase()
                } else {
                    chunk.clone()
                };
                let token = match op.as_str() {
                    "AND" => Some(Token::And),
                    "OR" => Some(Token::Or),
                    "NOT" => Some(Token::Not),
                    "XOR" => Some(Token::Xor),
                    _ => None,
                };
                if let Some(token) = token {
                    tokens.push(token);
                    continue;
                }
            }
            tokens.push(word_token(None, &chunk, flags, at_end));
        }
        tokens
    }

    /// Term for one query word under the stemming strategy
    fn term_for(&self, prefix: &str, word: &str, original: &str, stem: bool) -> String {
        if !stem || self.stemmer.is_none() {
            return format!("{prefix}{word}");
        }
        match self.strategy {
            StemStrategy::None => format!("{prefix}{word}"),
            StemStrategy::Some => {
                let capitalised = original.chars().next().is_some_and(char::is_uppercase);
                if capitalised {
                    format!("{prefix}{word}")
                } else {
                    format!("Z{prefix}{}", self.stemmer.stem(word))
                }
            }
            StemStrategy::All => format!("{prefix}{}", self.stemmer.stem(word)),
        }
    }
}

fn read_quoted(chars: &[char], mut i: usize) -> (String, usize) {
    let start = i;
    while i < chars.len() && chars[i] != '"' {
        i += 1;
    }
    let body = chars[start..i].iter().collect();
    (body, (i + 1).min(chars.len()))
}

fn word_token(field: Option<String>, text: &str, flags: ParserFlags, at_end: bool) -> Token {
    let (text, wildcard) = match text.strip_suffix('*') {
        Some(stripped) if flags.contains(ParserFlags::WILDCARD) && !stripped.is_empty() => {
            (stripped, true)
        }
        _ => (text, false),
    };
    Token::Word {
        field,
        text: text.to_string(),
        wildcard,
        partial: at_end && !wildcard && flags.contains(ParserFlags::PARTIAL),
    }
}

fn syntax_error(message: &str) -> EngineError {
    EngineError::new(EngineErrorKind::QueryParser, format!("Syntax: {message}"))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word {
        field: Option<String>,
        text: String,
        wildcard: bool,
        partial: bool,
    },
    Phrase {
        field: Option<String>,
        text: String,
    },
    Love,
    Hate,
    And,
    Or,
    Not,
    Xor,
    Open,
    Close,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Plain,
    Love,
    Hate,
}

struct ParseState<'a> {
    parser: &'a QueryParser,
    flags: ParserFlags,
    default_prefix: &'a str,
    engine: Option<&'a dyn IndexEngine>,
    tokens: Vec<Token>,
    pos: usize,
}

/// Result of one parsed item before it is placed in a sequence
enum Item {
    Query(Query),
    Filter { field: String, query: Query },
}

impl ParseState<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> EngineResult<Option<Query>> {
        let mut left = self.parse_xor()?;
        while self.eat(&Token::Or) {
            let right = self.parse_xor()?;
            left = either(QueryOp::Or, left, right, "OR")?;
        }
        Ok(left)
    }

    fn parse_xor(&mut self) -> EngineResult<Option<Query>> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Xor) {
            let right = self.parse_and()?;
            left = either(QueryOp::Xor, left, right, "XOR")?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> EngineResult<Option<Query>> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = either(QueryOp::And, left, right, "AND")?;
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> EngineResult<Option<Query>> {
        let mut left = self.parse_sequence()?;
        while self.eat(&Token::Not) {
            let right = self
                .parse_sequence()?
                .ok_or_else(|| syntax_error("expected an expression after NOT"))?;
            let base = match left {
                Some(q) => q,
                None if self.flags.contains(ParserFlags::PURE_NOT) => Query::MatchAll,
                None => return Err(syntax_error("<expression> NOT <expression>")),
            };
            left = Some(join(QueryOp::AndNot, base, right));
        }
        Ok(left)
    }

    fn parse_sequence(&mut self) -> EngineResult<Option<Query>> {
        let mut plain = Vec::new();
        let mut loved = Vec::new();
        let mut hated = Vec::new();
        let mut filters: BTreeMap<String, Vec<Query>> = BTreeMap::new();

        loop {
            let mark = if self.eat(&Token::Love) {
                Mark::Love
            } else if self.eat(&Token::Hate) {
                Mark::Hate
            } else {
                Mark::Plain
            };

            let item = match self.peek().cloned() {
                Some(Token::Word {
                    field,
                    text,
                    wildcard,
                    partial,
                }) => {
                    self.pos += 1;
                    self.word(field.as_deref(), &text, wildcard, partial)?
                }
                Some(Token::Phrase { field, text }) => {
                    self.pos += 1;
                    self.phrase(field.as_deref(), &text)
                }
                Some(Token::Open) => {
                    self.pos += 1;
                    let inner = self.parse_or()?;
                    if !self.eat(&Token::Close) && self.peek().is_some() {
                        return Err(syntax_error("expected ')'"));
                    }
                    inner.map(Item::Query)
                }
                _ => {
                    if mark != Mark::Plain {
                        return Err(syntax_error("expected a term after '+' or '-'"));
                    }
                    break;
                }
            };

            match (item, mark) {
                (None, _) => {}
                (Some(Item::Filter { query, .. }), Mark::Hate) => hated.push(query),
                (Some(Item::Filter { field, query }), _) => {
                    filters.entry(field).or_default().push(query)
                }
                (Some(Item::Query(q)), Mark::Plain) => plain.push(q),
                (Some(Item::Query(q)), Mark::Love) => loved.push(q),
                (Some(Item::Query(q)), Mark::Hate) => hated.push(q),
            }
        }

        let mut main = match plain.len() {
            0 => None,
            1 => plain.pop(),
            _ => Some(Query::combine(self.parser.default_op, plain)),
        };

        if !loved.is_empty() {
            let required = combine_all(QueryOp::And, loved);
            main = Some(match main {
                Some(optional) => Query::combine(QueryOp::AndMaybe, vec![required, optional]),
                None => required,
            });
        }

        if !hated.is_empty() {
            let base = match main {
                Some(q) => q,
                None if self.flags.contains(ParserFlags::PURE_NOT) => Query::MatchAll,
                None => return Err(syntax_error("a query cannot consist only of excluded terms")),
            };
            main = Some(Query::combine(
                QueryOp::AndNot,
                vec![base, combine_all(QueryOp::Or, hated)],
            ));
        }

        if !filters.is_empty() {
            let groups: Vec<Query> = filters
                .into_iter()
                .map(|(field, terms)| {
                    let exclusive = self
                        .parser
                        .fields
                        .get(&field)
                        .map(|f| f.exclusive)
                        .unwrap_or(true);
                    combine_all(if exclusive { QueryOp::Or } else { QueryOp::And }, terms)
                })
                .collect();
            let filter = combine_all(QueryOp::And, groups);
            main = Some(match main {
                Some(q) => Query::combine(QueryOp::Filter, vec![q, filter]),
                None => Query::Scale {
                    factor: 0.0,
                    query: Box::new(filter),
                },
            });
        }

        Ok(main)
    }

    fn prefixes(&self, field: Option<&str>) -> (Vec<String>, bool) {
        match field.and_then(|f| self.parser.fields.get(f)) {
            Some(info) => (info.prefixes.clone(), info.boolean),
            None => (vec![self.default_prefix.to_string()], false),
        }
    }

    fn word(
        &self,
        field: Option<&str>,
        text: &str,
        wildcard: bool,
        partial: bool,
    ) -> EngineResult<Option<Item>> {
        let (prefixes, boolean) = self.prefixes(field);

        if boolean {
            let terms: Vec<Query> = prefixes
                .iter()
                .map(|p| Query::term(format!("{p}{text}")))
                .collect();
            return Ok(Some(Item::Filter {
                field: field.unwrap_or_default().to_string(),
                query: combine_all(QueryOp::Or, terms),
            }));
        }

        let words = tokenize(text);
        if words.is_empty() {
            return Ok(None);
        }
        if words.len() > 1 {
            return Ok(self.phrase(field, text));
        }
        let word = &words[0];

        let mut per_prefix = Vec::with_capacity(prefixes.len());
        for prefix in &prefixes {
            let query = if wildcard {
                self.expand(&format!("{prefix}{word}"))?
            } else if partial {
                let exact = Query::term(self.parser.term_for(prefix, word, text, true));
                let expanded = self.expand(&format!("{prefix}{word}"))?;
                if expanded.is_match_nothing() {
                    exact
                } else {
                    Query::combine(QueryOp::Or, vec![expanded, exact])
                }
            } else {
                Query::term(self.parser.term_for(prefix, word, text, true))
            };
            per_prefix.push(query);
        }
        Ok(Some(Item::Query(combine_all(QueryOp::Or, per_prefix))))
    }

    fn phrase(&self, field: Option<&str>, text: &str) -> Option<Item> {
        let (prefixes, _) = self.prefixes(field);
        let words = tokenize(text);
        if words.is_empty() {
            return None;
        }
        let per_prefix: Vec<Query> = prefixes
            .iter()
            .map(|prefix| {
                let terms: Vec<Query> = words
                    .iter()
                    .enumerate()
                    .map(|(i, w)| Query::Term {
                        name: format!("{prefix}{w}"),
                        wqf: 1,
                        pos: i as u32 + 1,
                    })
                    .collect();
                if terms.len() == 1 {
                    terms.into_iter().next().unwrap_or(Query::MatchNothing)
                } else if self.flags.contains(ParserFlags::PHRASE) {
                    Query::combine(QueryOp::Phrase, terms)
                } else {
                    Query::combine(self.parser.default_op, terms)
                }
            })
            .collect();
        Some(Item::Query(combine_all(QueryOp::Or, per_prefix)))
    }

    /// Expand a wildcard into the terms present in the index
    fn expand(&self, stem: &str) -> EngineResult<Query> {
        let Some(engine) = self.engine else {
            return Ok(Query::MatchNothing);
        };
        let terms = engine.terms_with_prefix(stem);
        let max = self.parser.max_wildcard_expansion;
        if max > 0 && terms.len() > max as usize {
            return Err(EngineError::new(
                EngineErrorKind::Wildcard,
                format!("Wildcard {stem}* expands to more than {max} terms"),
            ));
        }
        Ok(match terms.len() {
            0 => Query::MatchNothing,
            _ => Query::combine(
                QueryOp::Synonym,
                terms.into_iter().map(Query::term).collect(),
            ),
        })
    }
}

/// Join two optional operands of a binary operator
fn either(
    op: QueryOp,
    left: Option<Query>,
    right: Option<Query>,
    name: &str,
) -> EngineResult<Option<Query>> {
    match (left, right) {
        (Some(l), Some(r)) => Ok(Some(join(op, l, r))),
        (Some(q), None) | (None, Some(q)) => Ok(Some(q)),
        (None, None) => Err(syntax_error(&format!("<expression> {name} <expression>"))),
    }
}

/// Combine, flattening a left operand that already uses `op`
fn join(op: QueryOp, left: Query, right: Query) -> Query {
    match left {
        Query::Combine {
            op: existing,
            parameter: 0,
            mut subqueries,
        } if existing == op && op != QueryOp::AndNot => {
            subqueries.push(right);
            Query::Combine {
                op,
                parameter: 0,
                subqueries,
            }
        }
        left => Query::combine(op, vec![left, right]),
    }
}

fn combine_all(op: QueryOp, mut queries: Vec<Query>) -> Query {
    if queries.len() == 1 {
        queries.pop().unwrap_or(Query::MatchNothing)
    } else {
        Query::combine(op, queries)
    }
}
