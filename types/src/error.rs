//! Parse errors for the identifier and hash types.

use thiserror::Error;

/// Errors raised while parsing identifiers, hashes and amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid xid: {0}")]
    InvalidXid(String),

    #[error("invalid cid: {0}")]
    InvalidCid(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}
