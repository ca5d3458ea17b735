//! RPC client error types.

use notary_ledger::{ContentError, LedgerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RpcError::Timeout(e.to_string())
        } else if e.is_connect() {
            RpcError::Connect(e.to_string())
        } else {
            RpcError::InvalidResponse(e.to_string())
        }
    }
}

/// bitcoind's `RPC_INVALID_ADDRESS_OR_KEY`, returned for unknown transactions,
/// blocks and mempool entries.
pub const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

impl From<RpcError> for LedgerError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::Node { code, message } if code == RPC_INVALID_ADDRESS_OR_KEY => {
                LedgerError::NotFound(message)
            }
            RpcError::Node { code, message } => LedgerError::Rpc { code, message },
            RpcError::InvalidResponse(msg) => LedgerError::InvalidResponse(msg),
            other => LedgerError::Unreachable(other.to_string()),
        }
    }
}

impl From<RpcError> for ContentError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::InvalidResponse(msg) => ContentError::InvalidContent(msg),
            other => ContentError::Unreachable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_object_maps_to_not_found() {
        let e = RpcError::Node {
            code: -5,
            message: "No such mempool or blockchain transaction".into(),
        };
        assert!(matches!(LedgerError::from(e), LedgerError::NotFound(_)));
    }

    #[test]
    fn other_node_errors_keep_their_code() {
        let e = RpcError::Node {
            code: -26,
            message: "insufficient fee".into(),
        };
        assert_eq!(
            LedgerError::from(e),
            LedgerError::Rpc {
                code: -26,
                message: "insufficient fee".into()
            }
        );
    }

    #[test]
    fn transport_failures_are_unreachable() {
        assert!(matches!(
            LedgerError::from(RpcError::Status(401)),
            LedgerError::Unreachable(_)
        ));
        assert!(matches!(
            ContentError::from(RpcError::Connect("refused".into())),
            ContentError::Unreachable(_)
        ));
    }
}
