//! Provenance certificate for a confirmed notarization.

use serde::{Deserialize, Serialize};

use crate::block::BlockHash;
use crate::cid::Cid;
use crate::tx::LedgerTransaction;
use crate::xid::Xid;

/// Immutable record proving that a notarization was confirmed.
///
/// Nothing here is free-standing state: every field is recomputable from the
/// ledger, and `xid` is a pure function of the asset xid and the txid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Certificate identity.
    pub xid: Xid,
    /// Identity of the certificate of the preceding notarization of the same
    /// asset, or `None` for a registration.
    pub prev: Option<Xid>,
    pub auth: Authorization,
}

/// The ledger facts a certificate attests to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub cid: Cid,
    /// The asset xid.
    pub xid: Xid,
    /// Data payload as text; empty for legacy payloads.
    pub op_return: String,
    /// Confirmation time, ISO-8601 UTC with second precision.
    pub time: String,
    #[serde(rename = "blockheight")]
    pub block_height: u64,
    #[serde(rename = "blockhash")]
    pub block_hash: BlockHash,
    /// `urn:chain:<ledger>:<height>:<position>:<output>`.
    #[serde(rename = "chainid")]
    pub chain_id: String,
    pub tx: LedgerTransaction,
}

/// Chain position descriptor for an output of a confirmed transaction.
pub fn chain_urn(ledger: &str, height: u64, position: usize, vout: u32) -> String {
    format!("urn:chain:{ledger}:{height}:{position}:{vout}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urn_format() {
        assert_eq!(chain_urn("BTC", 820_000, 17, 0), "urn:chain:BTC:820000:17:0");
    }
}
