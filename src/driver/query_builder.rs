//! Query tree decoding.
//!
//! A query arrives as a tagged tree. Decoding produces a [`QueryNode`]
//! without touching the index; [`QueryNode::build`] then turns it into an
//! engine [`Query`], running the free-text parser for parsed leaves.

use crate::core::engine::{IndexEngine, Query, QueryOp, ValueSlot};
use crate::core::text::{ParserFlags, QueryParser, StemStrategy, Stemmer};
use crate::driver::codec::Decoder;
use crate::driver::error::{DriverError, DriverResult};

// Node tags
const QUERY_GROUP: u8 = 1;
const QUERY_VALUE: u8 = 2;
const QUERY_VALUE_RANGE: u8 = 3;
const QUERY_TERM: u8 = 4;
const QUERY_PARSER: u8 = 5;
const QUERY_SCALE_WEIGHT: u8 = 6;

// Operator codes
const OP_AND: u8 = 0;
const OP_OR: u8 = 1;
const OP_AND_NOT: u8 = 2;
const OP_XOR: u8 = 3;
const OP_AND_MAYBE: u8 = 4;
const OP_FILTER: u8 = 5;
const OP_NEAR: u8 = 6;
const OP_PHRASE: u8 = 7;
const OP_VALUE_RANGE: u8 = 8;
const OP_SCALE_WEIGHT: u8 = 9;
const OP_ELITE_SET: u8 = 10;
const OP_VALUE_GE: u8 = 11;
const OP_VALUE_LE: u8 = 12;
const OP_SYNONYM: u8 = 13;

// Parser program commands
const QP_STEMMER: u8 = 1;
const QP_STEMMING_STRATEGY: u8 = 2;
const QP_MAX_WILDCARD_EXPANSION: u8 = 3;
const QP_DEFAULT_OP: u8 = 4;
const QP_PARSER_TYPE: u8 = 5;
const QP_PREFIX: u8 = 6;

// Feature ids 1..=11 select one flag bit each; 12 is the default set
const FEATURE_DEFAULT: u8 = 12;

/// Map a combinator operator code
pub fn combinator_op(code: u8) -> DriverResult<QueryOp> {
    match code {
        OP_AND => Ok(QueryOp::And),
        OP_OR => Ok(QueryOp::Or),
        OP_AND_NOT => Ok(QueryOp::AndNot),
        OP_XOR => Ok(QueryOp::Xor),
        OP_AND_MAYBE => Ok(QueryOp::AndMaybe),
        OP_FILTER => Ok(QueryOp::Filter),
        OP_NEAR => Ok(QueryOp::Near),
        OP_PHRASE => Ok(QueryOp::Phrase),
        OP_ELITE_SET => Ok(QueryOp::EliteSet),
        OP_SYNONYM => Ok(QueryOp::Synonym),
        other => Err(DriverError::BadCommand(other)),
    }
}

/// Comparison of a single-value leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCompare {
    AtLeast,
    AtMost,
}

/// Starting point of a customized parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserBase {
    /// The session's default parser
    Default,
    /// A parser with no configuration at all
    Empty,
}

/// One step of a parser program
#[derive(Debug, Clone, PartialEq)]
pub enum ParserCommand {
    Stemmer(String),
    StemmingStrategy(StemStrategy),
    MaxWildcardExpansion(u32),
    DefaultOp(QueryOp),
    Base(ParserBase),
    Prefix {
        field: String,
        prefix: String,
        boolean: bool,
        exclusive: bool,
    },
}

/// Customizations applied to a clone of the session parser
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserProgram {
    commands: Vec<ParserCommand>,
}

impl ParserProgram {
    pub fn new(commands: Vec<ParserCommand>) -> Self {
        Self { commands }
    }

    pub fn decode(dec: &mut Decoder<'_>) -> DriverResult<Self> {
        let mut commands = Vec::new();
        loop {
            let command = match dec.read_u8()? {
                0 => break,
                QP_STEMMER => ParserCommand::Stemmer(dec.read_string()?),
                QP_STEMMING_STRATEGY => ParserCommand::StemmingStrategy(match dec.read_u8()? {
                    0 => StemStrategy::None,
                    1 => StemStrategy::Some,
                    2 => StemStrategy::All,
                    other => return Err(DriverError::BadCommand(other)),
                }),
                QP_MAX_WILDCARD_EXPANSION => ParserCommand::MaxWildcardExpansion(dec.read_u32()?),
                QP_DEFAULT_OP => ParserCommand::DefaultOp(combinator_op(dec.read_u8()?)?),
                QP_PARSER_TYPE => ParserCommand::Base(match dec.read_u8()? {
                    0 => ParserBase::Default,
                    1 => ParserBase::Empty,
                    other => return Err(DriverError::BadCommand(other)),
                }),
                QP_PREFIX => ParserCommand::Prefix {
                    field: dec.read_string()?,
                    prefix: dec.read_string()?,
                    boolean: dec.read_bool()?,
                    exclusive: dec.read_bool()?,
                },
                other => return Err(DriverError::BadCommand(other)),
            };
            commands.push(command);
        }
        Ok(Self { commands })
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Apply the program to a clone of `default`; `default` is untouched
    pub fn resolve(&self, default: &QueryParser) -> DriverResult<QueryParser> {
        let mut parser = default.clone();
        for command in &self.commands {
            match command {
                ParserCommand::Stemmer(language) => parser.set_stemmer(Stemmer::new(language)?),
                ParserCommand::StemmingStrategy(strategy) => {
                    parser.set_stemming_strategy(*strategy)
                }
                ParserCommand::MaxWildcardExpansion(max) => parser.set_max_wildcard_expansion(*max),
                ParserCommand::DefaultOp(op) => parser.set_default_op(*op)?,
                ParserCommand::Base(ParserBase::Default) => parser = default.clone(),
                ParserCommand::Base(ParserBase::Empty) => parser = QueryParser::new(),
                ParserCommand::Prefix {
                    field,
                    prefix,
                    boolean: true,
                    exclusive,
                } => parser.add_boolean_prefix(field, prefix, *exclusive)?,
                ParserCommand::Prefix { field, prefix, .. } => parser.add_prefix(field, prefix)?,
            }
        }
        Ok(parser)
    }
}

/// Decode a feature list (ids terminated by 0)
pub fn decode_features(dec: &mut Decoder<'_>) -> DriverResult<ParserFlags> {
    let mut flags = ParserFlags::empty();
    loop {
        let flag = match dec.read_u8()? {
            0 => return Ok(flags),
            FEATURE_DEFAULT => ParserFlags::DEFAULT,
            id => ParserFlags::from_bits(1u32 << (id - 1).min(31))
                .ok_or(DriverError::BadCommand(id))?,
        };
        flags.insert(flag);
    }
}

/// Decoded query tree
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Combinator {
        op: QueryOp,
        parameter: u32,
        children: Vec<QueryNode>,
    },
    Value {
        compare: ValueCompare,
        slot: ValueSlot,
        value: Vec<u8>,
    },
    ValueRange {
        slot: ValueSlot,
        lower: Vec<u8>,
        upper: Vec<u8>,
    },
    Term {
        name: String,
        wqf: u32,
        pos: u32,
    },
    Parsed {
        parser: ParserProgram,
        query: String,
        default_prefix: String,
        flags: ParserFlags,
    },
    Scaled {
        factor: f64,
        child: Box<QueryNode>,
    },
}

impl QueryNode {
    /// Decode one tree; nesting deeper than `max_depth` is rejected
    pub fn decode(dec: &mut Decoder<'_>, max_depth: usize) -> DriverResult<Self> {
        Self::decode_at(dec, 1, max_depth)
    }

    fn decode_at(dec: &mut Decoder<'_>, depth: usize, max_depth: usize) -> DriverResult<Self> {
        if depth > max_depth {
            return Err(DriverError::BadArgument(format!(
                "Query tree deeper than {max_depth} levels"
            )));
        }

        match dec.read_u8()? {
            QUERY_GROUP => {
                let op = combinator_op(dec.read_u8()?)?;
                let parameter = dec.read_u32()?;
                let count = dec.read_u32()?;
                // Each child needs at least one byte
                let mut children = Vec::with_capacity((count as usize).min(dec.remaining()));
                for _ in 0..count {
                    children.push(Self::decode_at(dec, depth + 1, max_depth)?);
                }
                Ok(QueryNode::Combinator {
                    op,
                    parameter,
                    children,
                })
            }
            QUERY_VALUE => {
                let compare = match dec.read_u8()? {
                    OP_VALUE_GE => ValueCompare::AtLeast,
                    OP_VALUE_LE => ValueCompare::AtMost,
                    other => return Err(DriverError::BadCommand(other)),
                };
                Ok(QueryNode::Value {
                    compare,
                    slot: dec.read_u32()?,
                    value: dec.read_bytes()?,
                })
            }
            QUERY_VALUE_RANGE => {
                let op = dec.read_u8()?;
                if op != OP_VALUE_RANGE {
                    return Err(DriverError::BadCommand(op));
                }
                Ok(QueryNode::ValueRange {
                    slot: dec.read_u32()?,
                    lower: dec.read_bytes()?,
                    upper: dec.read_bytes()?,
                })
            }
            QUERY_TERM => Ok(QueryNode::Term {
                name: dec.read_string()?,
                wqf: dec.read_u32()?,
                pos: dec.read_u32()?,
            }),
            QUERY_PARSER => Ok(QueryNode::Parsed {
                parser: ParserProgram::decode(dec)?,
                query: dec.read_string()?,
                default_prefix: dec.read_string()?,
                flags: decode_features(dec)?,
            }),
            QUERY_SCALE_WEIGHT => {
                let op = dec.read_u8()?;
                if op != OP_SCALE_WEIGHT {
                    return Err(DriverError::BadCommand(op));
                }
                let factor = dec.read_f64()?;
                if factor.is_nan() || factor < 0.0 {
                    return Err(DriverError::BadArgument(format!(
                        "Scale factor must be non-negative, got {factor}"
                    )));
                }
                let child = Self::decode_at(dec, depth + 1, max_depth)?;
                Ok(QueryNode::Scaled {
                    factor,
                    child: Box::new(child),
                })
            }
            other => Err(DriverError::BadCommand(other)),
        }
    }

    /// Turn the tree into an engine query.
    ///
    /// `engine` is only consulted by the parser, for wildcard expansion.
    pub fn build(
        &self,
        default_parser: &QueryParser,
        engine: Option<&dyn IndexEngine>,
    ) -> DriverResult<Query> {
        Ok(match self {
            QueryNode::Combinator {
                op,
                parameter,
                children,
            } => Query::Combine {
                op: *op,
                parameter: *parameter,
                subqueries: children
                    .iter()
                    .map(|child| child.build(default_parser, engine))
                    .collect::<DriverResult<Vec<_>>>()?,
            },
            QueryNode::Value {
                compare: ValueCompare::AtLeast,
                slot,
                value,
            } => Query::ValueGe {
                slot: *slot,
                limit: value.clone(),
            },
            QueryNode::Value {
                compare: ValueCompare::AtMost,
                slot,
                value,
            } => Query::ValueLe {
                slot: *slot,
                limit: value.clone(),
            },
            QueryNode::ValueRange { slot, lower, upper } => Query::ValueRange {
                slot: *slot,
                lower: lower.clone(),
                upper: upper.clone(),
            },
            QueryNode::Term { name, wqf, pos } => Query::Term {
                name: name.clone(),
                wqf: *wqf,
                pos: *pos,
            },
            QueryNode::Parsed {
                parser,
                query,
                default_prefix,
                flags,
            } => {
                let resolved;
                let parser = if parser.is_empty() {
                    default_parser
                } else {
                    resolved = parser.resolve(default_parser)?;
                    &resolved
                };
                parser.parse_query(query, *flags, default_prefix, engine)?
            }
            QueryNode::Scaled { factor, child } => Query::Scale {
                factor: *factor,
                query: Box::new(child.build(default_parser, engine)?),
            },
        })
    }
}
