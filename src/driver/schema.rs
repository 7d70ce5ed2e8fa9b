//! Field-emission schemas.
//!
//! A schema says which fields to write for each row. It is decoded once,
//! into a typed list, and replayed unchanged for every row a cursor or
//! query emits.

use crate::core::engine::{Document, MSetItem, TermPos, ValueSlot};
use crate::core::sortable;
use crate::driver::codec::{Decoder, Encoder};
use crate::driver::error::{DriverError, DriverResult};

// Document decoders
const DEC_DOCUMENT: u8 = 0;
const DEC_ITERATOR: u8 = 1;
const DEC_BOTH: u8 = 2;

// Document fields
const GET_VALUE: u8 = 1;
const GET_DATA: u8 = 2;
const GET_DOCID: u8 = 3;
const GET_WEIGHT: u8 = 4;
const GET_RANK: u8 = 5;
const GET_PERCENT: u8 = 6;
const GET_FLOAT_VALUE: u8 = 7;
const GET_MULTI_DOCID: u8 = 8;
const GET_DB_NUMBER: u8 = 9;
const GET_COLLAPSE_COUNT: u8 = 10;

// Term fields
const TERM_VALUE: u8 = 1;
const TERM_WDF: u8 = 2;
const TERM_FREQ: u8 = 3;
const TERM_POS_COUNT: u8 = 4;
const TERM_POSITIONS: u8 = 5;

// Value type markers in emitted rows
const STRING_TYPE: u8 = 0;
const DOUBLE_TYPE: u8 = 1;

/// Where document fields are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    /// The stored document only
    Document,
    /// The match iterator only
    Iterator,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentField {
    Value(ValueSlot),
    Data,
    Docid,
    Weight,
    Rank,
    Percent,
    FloatValue(ValueSlot),
    MultiDocid,
    DbNumber,
    CollapseCount,
}

impl DocumentField {
    fn needs_document(self) -> bool {
        matches!(
            self,
            DocumentField::Value(_)
                | DocumentField::Data
                | DocumentField::Docid
                | DocumentField::FloatValue(_)
        )
    }

    fn needs_iterator(self) -> bool {
        !matches!(
            self,
            DocumentField::Value(_) | DocumentField::Data | DocumentField::FloatValue(_)
        )
    }

    fn allowed_by(self, kind: DecoderKind) -> bool {
        match kind {
            DecoderKind::Document => self.needs_document(),
            DecoderKind::Iterator => self.needs_iterator(),
            DecoderKind::Both => true,
        }
    }
}

/// Typed document-row schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSchema {
    decoder: DecoderKind,
    fields: Vec<DocumentField>,
}

impl DocumentSchema {
    pub fn new(decoder: DecoderKind, fields: Vec<DocumentField>) -> Self {
        Self { decoder, fields }
    }

    pub fn decode(dec: &mut Decoder<'_>) -> DriverResult<Self> {
        let decoder = match dec.read_u8()? {
            DEC_DOCUMENT => DecoderKind::Document,
            DEC_ITERATOR => DecoderKind::Iterator,
            DEC_BOTH => DecoderKind::Both,
            other => return Err(DriverError::BadCommand(other)),
        };

        let mut fields = Vec::new();
        loop {
            let field = match dec.read_u8()? {
                0 => break,
                GET_VALUE => DocumentField::Value(dec.read_u32()?),
                GET_DATA => DocumentField::Data,
                GET_DOCID => DocumentField::Docid,
                GET_WEIGHT => DocumentField::Weight,
                GET_RANK => DocumentField::Rank,
                GET_PERCENT => DocumentField::Percent,
                GET_FLOAT_VALUE => DocumentField::FloatValue(dec.read_u32()?),
                GET_MULTI_DOCID => DocumentField::MultiDocid,
                GET_DB_NUMBER => DocumentField::DbNumber,
                GET_COLLAPSE_COUNT => DocumentField::CollapseCount,
                other => return Err(DriverError::BadCommand(other)),
            };
            if !field.allowed_by(decoder) {
                return Err(DriverError::BadArgument(format!(
                    "{field:?} cannot be read with the {decoder:?} decoder"
                )));
            }
            fields.push(field);
        }
        Ok(Self { decoder, fields })
    }

    pub fn decoder(&self) -> DecoderKind {
        self.decoder
    }

    pub fn fields(&self) -> &[DocumentField] {
        &self.fields
    }

    /// Emit a stored document that was not reached through a match
    pub fn emit_document(&self, doc: &Document, enc: &mut Encoder) -> DriverResult<()> {
        if self.decoder != DecoderKind::Document {
            return Err(DriverError::BadArgument(
                "Documents fetched by id can only use the document decoder".to_string(),
            ));
        }
        for field in &self.fields {
            write_stored(*field, doc, enc)?;
        }
        Ok(())
    }

    /// Emit one match item
    pub fn emit_item(&self, item: &MSetItem, enc: &mut Encoder) {
        for field in &self.fields {
            match field {
                DocumentField::Docid if self.decoder == DecoderKind::Iterator => {
                    enc.write_u32(item.sub_docid)
                }
                DocumentField::Docid => enc.write_u32(item.document.docid()),
                DocumentField::Value(slot) => write_value(&item.document, *slot, enc),
                DocumentField::FloatValue(slot) => write_float_value(&item.document, *slot, enc),
                DocumentField::Data => enc.write_bytes(item.document.data()),
                DocumentField::Weight => enc.write_f64(item.weight),
                DocumentField::Rank => enc.write_u32(item.rank),
                DocumentField::Percent => enc.write_u8(item.percent),
                DocumentField::MultiDocid => enc.write_u32(item.docid),
                DocumentField::DbNumber => enc.write_u32(item.db_number),
                DocumentField::CollapseCount => enc.write_u32(item.collapse_count),
            }
        }
    }
}

fn write_value(doc: &Document, slot: ValueSlot, enc: &mut Encoder) {
    enc.write_u8(STRING_TYPE);
    enc.write_bytes(doc.value(slot));
}

fn write_float_value(doc: &Document, slot: ValueSlot, enc: &mut Encoder) {
    enc.write_u8(DOUBLE_TYPE);
    enc.write_f64(sortable::unserialise(doc.value(slot)));
}

fn write_stored(field: DocumentField, doc: &Document, enc: &mut Encoder) -> DriverResult<()> {
    match field {
        DocumentField::Value(slot) => write_value(doc, slot, enc),
        DocumentField::FloatValue(slot) => write_float_value(doc, slot, enc),
        DocumentField::Data => enc.write_bytes(doc.data()),
        DocumentField::Docid => enc.write_u32(doc.docid()),
        DocumentField::Weight
        | DocumentField::Rank
        | DocumentField::Percent
        | DocumentField::MultiDocid
        | DocumentField::DbNumber
        | DocumentField::CollapseCount => {
            return Err(DriverError::BadArgument(format!(
                "{field:?} is only available from a match"
            )))
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermField {
    Value,
    Wdf,
    Freq,
    PositionCount,
    Positions,
}

/// One row of a term list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRow {
    pub term: Vec<u8>,
    pub wdf: u32,
    pub freq: u32,
    pub positions: Vec<TermPos>,
}

/// Typed term-row schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermSchema {
    fields: Vec<TermField>,
}

impl TermSchema {
    pub fn new(fields: Vec<TermField>) -> Self {
        Self { fields }
    }

    pub fn decode(dec: &mut Decoder<'_>) -> DriverResult<Self> {
        let mut fields = Vec::new();
        loop {
            fields.push(match dec.read_u8()? {
                0 => return Ok(Self { fields }),
                TERM_VALUE => TermField::Value,
                TERM_WDF => TermField::Wdf,
                TERM_FREQ => TermField::Freq,
                TERM_POS_COUNT => TermField::PositionCount,
                TERM_POSITIONS => TermField::Positions,
                other => return Err(DriverError::BadCommand(other)),
            });
        }
    }

    pub fn emit(&self, row: &TermRow, enc: &mut Encoder) {
        for field in &self.fields {
            match field {
                TermField::Value => enc.write_bytes(&row.term),
                TermField::Wdf => enc.write_u32(row.wdf),
                TermField::Freq => enc.write_u32(row.freq),
                TermField::PositionCount => enc.write_u32(row.positions.len() as u32),
                TermField::Positions => {
                    enc.write_u32(row.positions.len() as u32);
                    for pos in &row.positions {
                        enc.write_u32(*pos);
                    }
                }
            }
        }
    }
}
