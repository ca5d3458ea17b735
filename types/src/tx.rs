//! Transaction views exchanged with the ledger node.
//!
//! The read-side structs mirror the node's verbose JSON (`listunspent`,
//! `getrawtransaction <txid> true`) closely enough to deserialize it directly.
//! The write-side types ([`TxInput`], [`TxOutput`]) describe a transaction to be
//! created.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::{self, Amount};
use crate::block::BlockHash;
use crate::hash::Txid;

/// Input sequence number that opts a transaction in to replace-by-fee.
pub const SEQUENCE_REPLACEABLE: u32 = 0xffff_fffd;

/// An unspent output owned by the node's wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: Txid,
    pub vout: u32,
    #[serde(with = "amount::btc")]
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub confirmations: i64,
}

impl Utxo {
    /// The input spending this output, signalling replaceability.
    pub fn to_input(&self) -> TxInput {
        TxInput {
            txid: self.txid,
            vout: self.vout,
            sequence: SEQUENCE_REPLACEABLE,
        }
    }
}

/// Output script as decoded by the node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPubKey {
    /// Script template name, e.g. `nulldata`, `witness_v0_keyhash`.
    #[serde(rename = "type")]
    pub kind: String,
    pub hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ScriptPubKey {
    pub const NULLDATA: &'static str = "nulldata";

    pub fn is_nulldata(&self) -> bool {
        self.kind == Self::NULLDATA
    }
}

/// One input of a decoded transaction. Coinbase inputs carry no previous
/// outpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<Txid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase: Option<String>,
    pub sequence: u32,
}

impl LedgerInput {
    /// The outpoint this input spends, as a write-side input with the same
    /// sequence.
    pub fn to_input(&self) -> Option<TxInput> {
        Some(TxInput {
            txid: self.txid?,
            vout: self.vout?,
            sequence: self.sequence,
        })
    }
}

/// One output of a decoded transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerOutput {
    #[serde(with = "amount::btc")]
    pub value: Amount,
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

/// A transaction as returned by `getrawtransaction <txid> true`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub txid: Txid,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hex: String,
    pub vin: Vec<LedgerInput>,
    pub vout: Vec<LedgerOutput>,
    /// Present once the transaction is in a block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockhash: Option<BlockHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocktime: Option<u64>,
}

impl LedgerTransaction {
    pub fn is_confirmed(&self) -> bool {
        self.blockhash.is_some()
    }

    pub fn output(&self, n: u32) -> Option<&LedgerOutput> {
        self.vout.iter().find(|o| o.n == n)
    }

    /// Transaction id spent by the first input, if it is not a coinbase.
    pub fn first_prev_txid(&self) -> Option<Txid> {
        self.vin.first().and_then(|i| i.txid)
    }
}

/// An input of a transaction to be created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub txid: Txid,
    pub vout: u32,
    pub sequence: u32,
}

/// An output of a transaction to be created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxOutput {
    /// Unspendable data-carrying output with the raw payload bytes.
    Data(Vec<u8>),
    Payment { address: Address, amount: Amount },
}

impl TxOutput {
    pub fn amount(&self) -> Amount {
        match self {
            Self::Data(_) => Amount::ZERO,
            Self::Payment { amount, .. } => *amount,
        }
    }
}

/// The fee a mempool transaction currently pays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolEntry {
    pub fee: Amount,
    pub vsize: u64,
}

/// Summary of the node's wallet (`getwalletinfo`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
    #[serde(rename = "walletname")]
    pub name: String,
    #[serde(with = "amount::btc")]
    pub balance: Amount,
    #[serde(default, with = "amount::btc")]
    pub unconfirmed_balance: Amount,
    #[serde(rename = "txcount", default)]
    pub tx_count: u64,
}
