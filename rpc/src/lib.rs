//! Clients for the notary's external collaborators.
//!
//! - [`BitcoindClient`]: the ledger node and its wallet over JSON-RPC
//! - [`IpfsClient`]: the content store's HTTP API, used to resolve the xid of
//!   legacy payloads

pub mod bitcoind;
pub mod error;
pub mod ipfs;

#[cfg(test)]
mod test_server;

pub use bitcoind::BitcoindClient;
pub use error::RpcError;
pub use ipfs::IpfsClient;
