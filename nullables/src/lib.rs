//! Nullable infrastructure for deterministic testing.
//!
//! The engine's collaborators (ledger node, content store) are abstracted
//! behind traits. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (fund, mine, go offline)
//! - Never touch the filesystem or network
//!
//! Usage: swap the RPC clients for nullables in tests.

pub mod content;
pub mod ledger;

pub use content::NullContentStore;
pub use ledger::NullLedgerNode;
