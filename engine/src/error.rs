use notary_ledger::{ContentError, LedgerError};
use notary_types::{Amount, Txid};
use thiserror::Error;

use crate::op_return::DecodeError;

/// Everything an engine operation can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotaryError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("asset state conflict: {0}")]
    AssetStateConflict(String),

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },

    #[error("new fee {new} not higher than current fee {current}")]
    FeeNotIncreased { current: Amount, new: Amount },

    #[error("transaction {0} already confirmed")]
    AlreadyConfirmed(Txid),

    /// Expected intermediate state: ask again after the next block.
    #[error("transaction {0} not yet confirmed")]
    NotYetConfirmed(Txid),

    #[error("transaction {txid} is not a notarization: {reason}")]
    NotANotarization { txid: Txid, reason: DecodeError },

    #[error("node unavailable: {0}")]
    NodeUnavailable(String),
}

/// Flat discriminant of [`NotaryError`] for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidIdentifier,
    AssetStateConflict,
    InsufficientFunds,
    FeeNotIncreased,
    AlreadyConfirmed,
    NotYetConfirmed,
    NotANotarization,
    NodeUnavailable,
}

impl ErrorKind {
    /// Whether the same call may succeed later without changing its inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NodeUnavailable | Self::NotYetConfirmed)
    }
}

impl NotaryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidIdentifier(_) => ErrorKind::InvalidIdentifier,
            Self::AssetStateConflict(_) => ErrorKind::AssetStateConflict,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::FeeNotIncreased { .. } => ErrorKind::FeeNotIncreased,
            Self::AlreadyConfirmed(_) => ErrorKind::AlreadyConfirmed,
            Self::NotYetConfirmed(_) => ErrorKind::NotYetConfirmed,
            Self::NotANotarization { .. } => ErrorKind::NotANotarization,
            Self::NodeUnavailable(_) => ErrorKind::NodeUnavailable,
        }
    }
}

impl From<LedgerError> for NotaryError {
    fn from(e: LedgerError) -> Self {
        NotaryError::NodeUnavailable(e.to_string())
    }
}

impl From<ContentError> for NotaryError {
    fn from(e: ContentError) -> Self {
        NotaryError::NodeUnavailable(e.to_string())
    }
}
