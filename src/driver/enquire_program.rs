//! Enquire programs.
//!
//! An ENQUIRE request carries a list of settings ending with `EC_STOP`.
//! The list is decoded in full first, then applied to a fresh [`Enquire`],
//! resolving weighting and key-maker handles against the session registry.

use crate::core::engine::{DocidOrder, Enquire, IndexEngine, MultiValueKeyMaker, SortOrder, ValueSlot, Weighting};
use crate::core::text::QueryParser;
use crate::driver::codec::Decoder;
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::query_builder::QueryNode;
use crate::driver::registry::{Handle, Registry};
use std::sync::Arc;

const EC_STOP: u8 = 0;
const EC_QUERY: u8 = 1;
const EC_QUERY_LEN: u8 = 2;
const EC_ORDER: u8 = 3;
const EC_DOCID_ORDER: u8 = 4;
const EC_WEIGHTING_SCHEME: u8 = 5;
const EC_CUTOFF: u8 = 6;
const EC_COLLAPSE_KEY: u8 = 7;

const OT_KEY: u8 = 1;
const OT_VALUE: u8 = 2;
const OT_KEY_RELEVANCE: u8 = 3;
const OT_RELEVANCE_KEY: u8 = 4;
const OT_RELEVANCE_VALUE: u8 = 5;
const OT_VALUE_RELEVANCE: u8 = 6;

const DOCID_ASCENDING: u8 = 0;
const DOCID_DESCENDING: u8 = 1;
const DOCID_DONT_CARE: u8 = 2;

/// Result ordering as sent by the client.
///
/// Key orders carry a KeyMaker handle, value orders a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSpec {
    Key(Handle),
    Value(ValueSlot),
    KeyThenRelevance(Handle),
    RelevanceThenKey(Handle),
    RelevanceThenValue(ValueSlot),
    ValueThenRelevance(ValueSlot),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnquireCommand {
    Query { tree: QueryNode, length: u32 },
    Order { order: OrderSpec, reverse: bool },
    DocidOrder(DocidOrder),
    Weighting(Handle),
    Cutoff { percent: u8, weight: f64 },
    /// Slot 0 turns collapsing off
    Collapse { slot: ValueSlot, max: u32 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnquireProgram {
    commands: Vec<EnquireCommand>,
}

impl EnquireProgram {
    pub fn new(commands: Vec<EnquireCommand>) -> Self {
        Self { commands }
    }

    pub fn commands(&self) -> &[EnquireCommand] {
        &self.commands
    }

    pub fn decode(dec: &mut Decoder<'_>, max_query_depth: usize) -> DriverResult<Self> {
        let mut commands = Vec::new();
        // EC_QUERY_LEN applies to every EC_QUERY after it
        let mut query_length = 0;

        loop {
            let command = match dec.read_u8()? {
                EC_STOP => return Ok(Self { commands }),
                EC_QUERY => EnquireCommand::Query {
                    tree: QueryNode::decode(dec, max_query_depth)?,
                    length: query_length,
                },
                EC_QUERY_LEN => {
                    query_length = dec.read_u32()?;
                    continue;
                }
                EC_ORDER => {
                    let kind = dec.read_u8()?;
                    let reverse = dec.read_bool()?;
                    let value = dec.read_u32()?;
                    let order = match kind {
                        OT_KEY => OrderSpec::Key(value),
                        OT_VALUE => OrderSpec::Value(value),
                        OT_KEY_RELEVANCE => OrderSpec::KeyThenRelevance(value),
                        OT_RELEVANCE_KEY => OrderSpec::RelevanceThenKey(value),
                        OT_RELEVANCE_VALUE => OrderSpec::RelevanceThenValue(value),
                        OT_VALUE_RELEVANCE => OrderSpec::ValueThenRelevance(value),
                        other => return Err(DriverError::BadCommand(other)),
                    };
                    EnquireCommand::Order { order, reverse }
                }
                EC_DOCID_ORDER => EnquireCommand::DocidOrder(match dec.read_u8()? {
                    DOCID_ASCENDING => DocidOrder::Ascending,
                    DOCID_DESCENDING => DocidOrder::Descending,
                    DOCID_DONT_CARE => DocidOrder::DontCare,
                    other => return Err(DriverError::BadCommand(other)),
                }),
                EC_WEIGHTING_SCHEME => EnquireCommand::Weighting(dec.read_u32()?),
                EC_CUTOFF => {
                    let percent = dec.read_u8()?;
                    let weight = dec.read_f64()?;
                    if percent > 100 {
                        return Err(DriverError::BadArgument(format!(
                            "Percent cutoff {percent} is above 100"
                        )));
                    }
                    EnquireCommand::Cutoff { percent, weight }
                }
                EC_COLLAPSE_KEY => EnquireCommand::Collapse {
                    slot: dec.read_u32()?,
                    max: dec.read_u32()?,
                },
                other => return Err(DriverError::BadCommand(other)),
            };
            commands.push(command);
        }
    }

    /// Apply every setting to a fresh enquire
    pub fn build(
        &self,
        registry: &Registry,
        parser: &QueryParser,
        engine: Option<&dyn IndexEngine>,
    ) -> DriverResult<Enquire> {
        let mut enquire = Enquire::new();
        for command in &self.commands {
            match command {
                EnquireCommand::Query { tree, length } => {
                    enquire.set_query(tree.build(parser, engine)?, *length);
                }
                EnquireCommand::Order { order, reverse } => {
                    enquire.set_sort(sort_order(registry, *order, *reverse)?);
                }
                EnquireCommand::DocidOrder(order) => enquire.set_docid_order(*order),
                EnquireCommand::Weighting(handle) => {
                    enquire.set_weighting(*registry.get::<Weighting>(*handle)?);
                }
                EnquireCommand::Cutoff { percent, weight } => {
                    enquire.set_cutoff(*percent, *weight);
                }
                EnquireCommand::Collapse { slot: 0, .. } => enquire.clear_collapse_key(),
                EnquireCommand::Collapse { slot, max } => enquire.set_collapse_key(*slot, *max),
            }
        }
        Ok(enquire)
    }
}

fn key_maker(registry: &Registry, handle: Handle) -> DriverResult<Arc<MultiValueKeyMaker>> {
    Ok(Arc::new(registry.get::<MultiValueKeyMaker>(handle)?.clone()))
}

fn sort_order(registry: &Registry, order: OrderSpec, reverse: bool) -> DriverResult<SortOrder> {
    Ok(match order {
        OrderSpec::Key(handle) => SortOrder::Key {
            maker: key_maker(registry, handle)?,
            reverse,
        },
        OrderSpec::KeyThenRelevance(handle) => SortOrder::KeyThenRelevance {
            maker: key_maker(registry, handle)?,
            reverse,
        },
        OrderSpec::RelevanceThenKey(handle) => SortOrder::RelevanceThenKey {
            maker: key_maker(registry, handle)?,
            reverse,
        },
        OrderSpec::Value(slot) => SortOrder::Value { slot, reverse },
        OrderSpec::ValueThenRelevance(slot) => SortOrder::ValueThenRelevance { slot, reverse },
        OrderSpec::RelevanceThenValue(slot) => SortOrder::RelevanceThenValue { slot, reverse },
    })
}
