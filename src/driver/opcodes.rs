//! Top-level request opcodes.

use crate::driver::error::{DriverError, DriverResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Open,
    LastDocId,
    AddDocument,
    Test,
    GetDocumentById,
    StartTransaction,
    CancelTransaction,
    CommitTransaction,
    QueryPage,
    SetDefaultStemmer,
    SetDefaultPrefixes,
    Enquire,
    ReleaseResource,
    MatchSet,
    QlcInit,
    QlcNextPortion,
    QlcLookup,
    GetResourceInfo,
    CreateResource,
    MSetInfo,
    DbInfo,
    SetMetadata,
    UpdateDocument,
    UpdateOrCreateDocument,
    DeleteDocument,
    ReplaceDocument,
    Document,
    OpenProg,
    OpenTcp,
    Close,
}

impl Opcode {
    const TABLE: [Opcode; 30] = [
        Opcode::Open,
        Opcode::LastDocId,
        Opcode::AddDocument,
        Opcode::Test,
        Opcode::GetDocumentById,
        Opcode::StartTransaction,
        Opcode::CancelTransaction,
        Opcode::CommitTransaction,
        Opcode::QueryPage,
        Opcode::SetDefaultStemmer,
        Opcode::SetDefaultPrefixes,
        Opcode::Enquire,
        Opcode::ReleaseResource,
        Opcode::MatchSet,
        Opcode::QlcInit,
        Opcode::QlcNextPortion,
        Opcode::QlcLookup,
        Opcode::GetResourceInfo,
        Opcode::CreateResource,
        Opcode::MSetInfo,
        Opcode::DbInfo,
        Opcode::SetMetadata,
        Opcode::UpdateDocument,
        Opcode::UpdateOrCreateDocument,
        Opcode::DeleteDocument,
        Opcode::ReplaceDocument,
        Opcode::Document,
        Opcode::OpenProg,
        Opcode::OpenTcp,
        Opcode::Close,
    ];

    pub fn from_tag(tag: u8) -> DriverResult<Self> {
        Self::TABLE
            .get(usize::from(tag))
            .copied()
            .ok_or(DriverError::BadCommand(tag))
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Requires a writable database
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            Opcode::AddDocument
                | Opcode::StartTransaction
                | Opcode::CancelTransaction
                | Opcode::CommitTransaction
                | Opcode::SetMetadata
                | Opcode::UpdateDocument
                | Opcode::UpdateOrCreateDocument
                | Opcode::DeleteDocument
                | Opcode::ReplaceDocument
        )
    }
}

/// Reply status byte
pub const STATUS_OK: u8 = 0;
pub const STATUS_ERROR: u8 = 1;

/// Row stream flags
pub const MORE: u8 = 1;
pub const STOP: u8 = 0;
