//! Notarization and certification engine.
//!
//! Anchors `cid::xid` pairs to the ledger and derives provenance certificates
//! once they confirm:
//! - OP_RETURN payload codec ([`op_return`])
//! - Decoded authorization view of a transaction ([`auth_tx`])
//! - Wallet UTXO classification into funding and stake sets ([`classifier`])
//! - Fee estimation with an optional ceiling ([`fee`])
//! - Coin selection and transaction construction ([`builder`])
//! - Replace-by-fee bumping ([`bumper`])
//! - Certificate derivation ([`certify`])
//!
//! [`Notary`] ties these together behind the produced surface and serializes
//! work per asset.

pub mod auth_tx;
pub mod builder;
pub mod bumper;
pub mod certify;
pub mod classifier;
pub mod error;
pub mod fee;
pub mod locks;
pub mod notary;
pub mod op_return;

pub use auth_tx::AuthTx;
pub use builder::{NotarizeOutcome, NotarizeRequest};
pub use classifier::{AssetUtxo, ClassifiedUtxo, WalletSnapshot};
pub use error::{ErrorKind, NotaryError};
pub use notary::{Notary, WalletReport};
pub use op_return::{DecodeError, Payload};
