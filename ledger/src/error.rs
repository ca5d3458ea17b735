use thiserror::Error;

/// Failures talking to the ledger node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Transport failure: connection refused, timeout, bad HTTP status.
    #[error("ledger node unreachable: {0}")]
    Unreachable(String),

    /// The node answered with a JSON-RPC error object.
    #[error("ledger node error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The node answered with something that does not decode.
    #[error("invalid response from ledger node: {0}")]
    InvalidResponse(String),

    /// The requested transaction, block or mempool entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The fee estimator has no data for the requested target.
    #[error("no fee estimate available for {target_blocks} blocks")]
    NoFeeEstimate { target_blocks: u32 },
}

/// Failures talking to the content store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error("content store unreachable: {0}")]
    Unreachable(String),

    #[error("invalid content: {0}")]
    InvalidContent(String),
}
