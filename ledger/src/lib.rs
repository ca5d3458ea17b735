//! Abstract collaborator traits for the notary.
//!
//! The engine talks to the ledger node and the content store only through
//! these traits. The JSON-RPC clients in `notary-rpc` and the in-memory
//! doubles in `notary-nullables` implement them; nothing else in the engine
//! knows which is plugged in.

pub mod content;
pub mod error;
pub mod node;

pub use content::ContentStore;
pub use error::{ContentError, LedgerError};
pub use node::LedgerNode;
