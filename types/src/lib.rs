//! Fundamental types for the notary.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! asset and content identifiers, ledger hashes, amounts, timestamps, engine
//! parameters, decoded transaction views, and the certificate record.

pub mod address;
pub mod amount;
pub mod block;
pub mod certificate;
pub mod cid;
pub mod error;
pub mod hash;
pub mod network;
pub mod params;
pub mod time;
pub mod tx;
pub mod xid;

pub use address::Address;
pub use amount::{Amount, FeeRate};
pub use block::{BlockHash, BlockInfo};
pub use certificate::{Authorization, Certificate};
pub use cid::Cid;
pub use error::TypesError;
pub use hash::Txid;
pub use network::Network;
pub use params::NotaryParams;
pub use time::Timestamp;
pub use tx::{
    LedgerInput, LedgerOutput, LedgerTransaction, MempoolEntry, ScriptPubKey, TxInput, TxOutput,
    Utxo, WalletInfo, SEQUENCE_REPLACEABLE,
};
pub use xid::Xid;
