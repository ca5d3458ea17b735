//! Ledger-node collaborator.

use async_trait::async_trait;
use notary_types::{
    Address, BlockHash, BlockInfo, FeeRate, LedgerTransaction, MempoolEntry, TxInput, TxOutput,
    Txid, Utxo, WalletInfo,
};

use crate::error::LedgerError;

/// The ledger node and its wallet.
///
/// Key management, signing and double-spend rejection all live on the node
/// side of this trait.
#[async_trait]
pub trait LedgerNode: Send + Sync {
    /// Unspent outputs of the wallet with at least `min_conf` confirmations,
    /// in the node's listing order. `0` includes mempool outputs.
    async fn list_unspent(&self, min_conf: u32) -> Result<Vec<Utxo>, LedgerError>;

    /// Decoded transaction. Fails with [`LedgerError::NotFound`] for unknown
    /// ids.
    async fn get_raw_transaction(&self, txid: &Txid) -> Result<LedgerTransaction, LedgerError>;

    async fn get_block(&self, hash: &BlockHash) -> Result<BlockInfo, LedgerError>;

    /// Fee rate expected to confirm within `target_blocks`.
    async fn estimate_fee_rate(&self, target_blocks: u32) -> Result<FeeRate, LedgerError>;

    async fn get_new_address(&self, label: &str) -> Result<Address, LedgerError>;

    /// Unsigned raw transaction hex, outputs kept in the given order.
    async fn create_raw_transaction(
        &self,
        inputs: &[TxInput],
        outputs: &[TxOutput],
    ) -> Result<String, LedgerError>;

    /// Sign with the node's wallet. Fails unless every input was signed.
    async fn sign_raw_transaction(&self, raw_hex: &str) -> Result<String, LedgerError>;

    async fn send_raw_transaction(&self, signed_hex: &str) -> Result<Txid, LedgerError>;

    /// Fee currently paid by an unconfirmed transaction.
    async fn get_mempool_entry(&self, txid: &Txid) -> Result<MempoolEntry, LedgerError>;

    async fn get_wallet_info(&self) -> Result<WalletInfo, LedgerError>;
}
