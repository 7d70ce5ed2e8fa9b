//! Document edit programs.
//!
//! An edit program is decoded in full into a list of [`EditOperation`]s
//! before any of it is applied, so a malformed program never half-edits a
//! document. Operations then run in stream order. Every existence check
//! happens before the mutation it guards; a failed check is a
//! `BadArgument`, or a silent no-op when the operation's `ignore` flag is
//! set.

use crate::core::engine::{Document, TermCount, TermPos, ValueSlot};
use crate::core::sortable;
use crate::core::text::{Stemmer, TermGenerator};
use crate::driver::codec::Decoder;
use crate::driver::error::{DriverError, DriverResult};

const STOP: u8 = 0;
const STEMMER: u8 = 1;
const DATA: u8 = 2;
const DELTA: u8 = 3;
const TEXT: u8 = 4;
const SET_TERM: u8 = 5;
const ADD_TERM: u8 = 6;
const UPDATE_TERM: u8 = 7;
const REMOVE_TERM: u8 = 8;
const ADD_VALUE: u8 = 9;
const SET_VALUE: u8 = 10;
const UPDATE_VALUE: u8 = 11;
const REMOVE_VALUE: u8 = 12;
const SET_WDF: u8 = 13;
const DEC_WDF: u8 = 14;
const SET_POSTING: u8 = 15;
const ADD_POSTING: u8 = 16;
const UPDATE_POSTING: u8 = 17;
const REMOVE_POSTING: u8 = 18;
const REMOVE_VALUES: u8 = 19;
const REMOVE_TERMS: u8 = 20;
const REMOVE_POSITIONS: u8 = 21;
const REMOVE_TERM_POSITIONS: u8 = 22;

// Typed value tags
const STRING_TYPE: u8 = 0;
const DOUBLE_TYPE: u8 = 1;

/// Existence policy of a term, value or posting edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// Apply unconditionally
    Set,
    /// Fail if already present
    Add,
    /// Fail if absent
    Update,
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOperation {
    SetStemmer(String),
    SetData(Vec<u8>),
    AdvancePosition(TermPos),
    IndexText {
        text: String,
        wdf_inc: TermCount,
        prefix: String,
    },
    Term {
        action: EditAction,
        term: String,
        wdf: TermCount,
        ignore: bool,
    },
    Value {
        action: EditAction,
        slot: ValueSlot,
        value: Vec<u8>,
        ignore: bool,
    },
    Posting {
        action: EditAction,
        term: String,
        pos: TermPos,
        wdf: TermCount,
        ignore: bool,
    },
    SetWdf {
        term: String,
        wdf: TermCount,
        ignore: bool,
    },
    DecreaseWdf {
        term: String,
        delta: TermCount,
        ignore: bool,
    },
    ClearValues,
    ClearTerms,
    ClearAllPositions,
    ClearTermPositions {
        term: String,
        ignore: bool,
    },
}

/// A typed value: raw bytes, or a double stored in sortable form
fn decode_value(dec: &mut Decoder<'_>) -> DriverResult<Vec<u8>> {
    match dec.read_u8()? {
        STRING_TYPE => dec.read_bytes(),
        DOUBLE_TYPE => Ok(sortable::serialise(dec.read_f64()?).to_vec()),
        other => Err(DriverError::BadCommand(other)),
    }
}

impl EditOperation {
    /// Decode one operation whose tag has already been read
    fn decode(tag: u8, dec: &mut Decoder<'_>) -> DriverResult<Self> {
        let action = match tag {
            SET_TERM | SET_VALUE | SET_POSTING => EditAction::Set,
            ADD_TERM | ADD_VALUE | ADD_POSTING => EditAction::Add,
            UPDATE_TERM | UPDATE_VALUE | UPDATE_POSTING => EditAction::Update,
            _ => EditAction::Remove,
        };

        Ok(match tag {
            STEMMER => EditOperation::SetStemmer(dec.read_string()?),
            DATA => EditOperation::SetData(dec.read_bytes()?),
            DELTA => EditOperation::AdvancePosition(dec.read_u32()?),
            TEXT => EditOperation::IndexText {
                text: dec.read_string()?,
                wdf_inc: dec.read_u32()?,
                prefix: dec.read_string()?,
            },
            SET_TERM | ADD_TERM | UPDATE_TERM | REMOVE_TERM => EditOperation::Term {
                action,
                term: dec.read_string()?,
                wdf: dec.read_u32()?,
                ignore: dec.read_bool()?,
            },
            ADD_VALUE | SET_VALUE | UPDATE_VALUE | REMOVE_VALUE => EditOperation::Value {
                action,
                slot: dec.read_u32()?,
                value: decode_value(dec)?,
                ignore: dec.read_bool()?,
            },
            SET_WDF => EditOperation::SetWdf {
                term: dec.read_string()?,
                wdf: dec.read_u32()?,
                ignore: dec.read_bool()?,
            },
            DEC_WDF => EditOperation::DecreaseWdf {
                term: dec.read_string()?,
                delta: dec.read_u32()?,
                ignore: dec.read_bool()?,
            },
            SET_POSTING | ADD_POSTING | UPDATE_POSTING | REMOVE_POSTING => {
                EditOperation::Posting {
                    action,
                    term: dec.read_string()?,
                    pos: dec.read_u32()?,
                    wdf: dec.read_u32()?,
                    ignore: dec.read_bool()?,
                }
            }
            REMOVE_VALUES => EditOperation::ClearValues,
            REMOVE_TERMS => EditOperation::ClearTerms,
            REMOVE_POSITIONS => EditOperation::ClearAllPositions,
            REMOVE_TERM_POSITIONS => EditOperation::ClearTermPositions {
                term: dec.read_string()?,
                ignore: dec.read_bool()?,
            },
            other => return Err(DriverError::BadCommand(other)),
        })
    }
}

/// Outcome of an existence check: `Ok(true)` proceed, `Ok(false)` skip
fn guard(ok: bool, ignore: bool, message: impl FnOnce() -> String) -> DriverResult<bool> {
    if ok {
        Ok(true)
    } else if ignore {
        Ok(false)
    } else {
        Err(DriverError::BadArgument(message()))
    }
}

fn missing_term(term: &str) -> impl FnOnce() -> String + '_ {
    move || format!("Term '{term}' is not in the document")
}

/// A decoded edit program
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditProgram {
    operations: Vec<EditOperation>,
}

impl EditProgram {
    pub fn new(operations: Vec<EditOperation>) -> Self {
        Self { operations }
    }

    /// Decode operations up to and including the terminating STOP
    pub fn decode(dec: &mut Decoder<'_>) -> DriverResult<Self> {
        let mut operations = Vec::new();
        loop {
            match dec.read_u8()? {
                STOP => return Ok(Self { operations }),
                tag => operations.push(EditOperation::decode(tag, dec)?),
            }
        }
    }

    pub fn operations(&self) -> &[EditOperation] {
        &self.operations
    }

    /// Apply every operation to `doc`, indexing text with
    /// `default_stemmer` until the program selects another
    pub fn apply(&self, doc: &mut Document, default_stemmer: &Stemmer) -> DriverResult<()> {
        let mut generator = TermGenerator::new(default_stemmer.clone());
        for operation in &self.operations {
            apply_one(operation, doc, &mut generator)?;
        }
        Ok(())
    }
}

fn apply_one(
    operation: &EditOperation,
    doc: &mut Document,
    generator: &mut TermGenerator,
) -> DriverResult<()> {
    match operation {
        EditOperation::SetStemmer(language) => generator.set_stemmer(Stemmer::new(language)?),
        EditOperation::SetData(data) => doc.set_data(data.clone()),
        EditOperation::AdvancePosition(delta) => generator.increase_termpos(*delta),
        EditOperation::IndexText {
            text,
            wdf_inc,
            prefix,
        } => generator.index_text(doc, text, *wdf_inc, prefix),

        EditOperation::Term {
            action,
            term,
            wdf,
            ignore,
        } => {
            let exists = doc.has_term(term);
            match action {
                EditAction::Remove => {
                    let matches = exists && (*wdf == 0 || *wdf == doc.wdf(term));
                    let message = || {
                        if exists {
                            format!("Term '{term}' has wdf {}, not {wdf}", doc.wdf(term))
                        } else {
                            format!("Term '{term}' is not in the document")
                        }
                    };
                    if guard(matches, *ignore, message)? {
                        doc.remove_term(term)?;
                    }
                }
                EditAction::Add => {
                    if guard(!exists, *ignore, || {
                        format!("Term '{term}' is already in the document")
                    })? {
                        doc.set_term(term, *wdf);
                    }
                }
                EditAction::Update => {
                    if guard(exists, *ignore, missing_term(term))? {
                        doc.set_term(term, *wdf);
                    }
                }
                EditAction::Set => doc.set_term(term, *wdf),
            }
        }

        EditOperation::Value {
            action,
            slot,
            value,
            ignore,
        } => {
            let exists = doc.has_value(*slot);
            match action {
                EditAction::Remove => {
                    if !value.is_empty() && doc.value(*slot) != value.as_slice() {
                        return Ok(());
                    }
                    if guard(exists, *ignore, || format!("Value slot {slot} is empty"))? {
                        doc.remove_value(*slot)?;
                    }
                }
                EditAction::Add => {
                    if guard(!exists, *ignore, || format!("Value slot {slot} is occupied"))? {
                        doc.add_value(*slot, value.clone());
                    }
                }
                EditAction::Update => {
                    if guard(exists, *ignore, || format!("Value slot {slot} is empty"))? {
                        doc.add_value(*slot, value.clone());
                    }
                }
                EditAction::Set => doc.add_value(*slot, value.clone()),
            }
        }

        EditOperation::Posting {
            action,
            term,
            pos,
            wdf,
            ignore,
        } => {
            let exists = doc.has_posting(term, *pos);
            let missing = || format!("Term '{term}' has no position {pos}");
            match action {
                EditAction::Remove => {
                    if guard(exists, *ignore, missing)? {
                        doc.remove_posting(term, *pos, *wdf)?;
                    }
                }
                EditAction::Add => {
                    if guard(!exists, *ignore, || {
                        format!("Term '{term}' already has position {pos}")
                    })? {
                        doc.add_posting(term, *pos, *wdf);
                    }
                }
                EditAction::Update => {
                    if guard(exists, *ignore, missing)? {
                        doc.add_posting(term, *pos, *wdf);
                    }
                }
                EditAction::Set => doc.add_posting(term, *pos, *wdf),
            }
        }

        EditOperation::SetWdf { term, wdf, ignore } => {
            if guard(doc.has_term(term), *ignore, missing_term(term))? {
                doc.set_wdf(term, *wdf)?;
            }
        }
        EditOperation::DecreaseWdf {
            term,
            delta,
            ignore,
        } => {
            if guard(doc.has_term(term), *ignore, missing_term(term))? {
                doc.decrease_wdf(term, *delta)?;
            }
        }

        EditOperation::ClearValues => doc.clear_values(),
        EditOperation::ClearTerms => doc.clear_terms(),
        EditOperation::ClearAllPositions => doc.clear_all_positions(),
        EditOperation::ClearTermPositions { term, ignore } => {
            if guard(doc.has_term(term), *ignore, missing_term(term))? {
                doc.clear_term_positions(term)?;
            }
        }
    }
    Ok(())
}
