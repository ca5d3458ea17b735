//! Nullable ledger node: an in-memory wallet, mempool and chain.
//!
//! Behaves like a regtest node with a single wallet:
//! - `create_raw_transaction` produces an opaque hex draft, `sign` checks every
//!   input belongs to the wallet, `send` validates inputs and fee
//! - spending an output held by a signalling mempool transaction replaces it
//!   when the new fee is higher, otherwise the send is rejected
//! - nothing confirms until [`NullLedgerNode::mine_block`] is called

use async_trait::async_trait;
use notary_ledger::{LedgerError, LedgerNode};
use notary_types::{
    Address, Amount, BlockHash, BlockInfo, FeeRate, LedgerInput, LedgerOutput,
    LedgerTransaction, MempoolEntry, ScriptPubKey, Timestamp, TxInput, TxOutput, Txid, Utxo,
    WalletInfo,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// First block time handed out by [`NullLedgerNode::mine_block`].
pub const GENESIS_TIME: u64 = 1_700_000_000;

/// Seconds between mined blocks.
pub const BLOCK_INTERVAL: u64 = 600;

type Outpoint = (Txid, u32);

#[derive(Serialize, Deserialize)]
struct Draft {
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
}

#[derive(Default)]
struct State {
    /// Unspent wallet outputs in listing order.
    utxos: Vec<Utxo>,
    /// Every wallet output ever seen, spent or not.
    wallet_outputs: HashMap<Outpoint, Utxo>,
    wallet_addresses: HashSet<String>,
    spent_by: HashMap<Outpoint, Txid>,
    txs: HashMap<Txid, LedgerTransaction>,
    /// Unconfirmed transactions and their fees, in arrival order.
    mempool: Vec<(Txid, Amount)>,
    blocks: HashMap<BlockHash, BlockInfo>,
    height: u64,
    fee_rate: Option<FeeRate>,
    next_address: u64,
    next_funding: u64,
    offline: bool,
    calls: HashMap<&'static str, usize>,
}

/// An in-memory [`LedgerNode`] for deterministic tests.
pub struct NullLedgerNode {
    state: Mutex<State>,
}

impl NullLedgerNode {
    /// Empty wallet, no fee estimate.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Node with a fee estimate of `sat_per_kvb`.
    pub fn with_fee_rate(sat_per_kvb: u64) -> Self {
        let node = Self::new();
        node.set_fee_rate(Some(FeeRate::from_sat_per_kvb(sat_per_kvb)));
        node
    }

    pub fn set_fee_rate(&self, rate: Option<FeeRate>) {
        self.state.lock().unwrap().fee_rate = rate;
    }

    /// Make every call fail as if the node were down.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Credit the wallet with a new unconfirmed output of `amount` at index 0
    /// of a fresh coinbase-like transaction.
    pub fn fund(&self, amount: Amount) -> Utxo {
        let mut state = self.state.lock().unwrap();
        state.next_funding += 1;
        let seed = format!("funding:{}", state.next_funding);
        let txid = Txid::new(sha256d(seed.as_bytes()));
        let address = state.fresh_address("recv");

        let tx = LedgerTransaction {
            txid,
            hex: String::new(),
            vin: vec![LedgerInput {
                txid: None,
                vout: None,
                coinbase: Some(hex::encode(seed)),
                sequence: u32::MAX,
            }],
            vout: vec![payment_output(0, &address, amount)],
            blockhash: None,
            confirmations: None,
            blocktime: None,
        };
        state.txs.insert(txid, tx);
        state.mempool.push((txid, Amount::ZERO));
        state.credit(txid, 0, &address, amount)
    }

    /// Add an arbitrary transaction to the mempool, paying no fee. Outputs to
    /// wallet addresses are credited; inputs are not checked.
    pub fn insert_transaction(&self, mut tx: LedgerTransaction) -> Txid {
        let mut state = self.state.lock().unwrap();
        let txid = tx.txid;
        tx.blockhash = None;
        tx.confirmations = None;
        tx.blocktime = None;
        for output in &tx.vout {
            if let Some(address) = &output.script_pub_key.address {
                if state.wallet_addresses.contains(address) {
                    if let Ok(address) = Address::new(address.clone()) {
                        state.credit(txid, output.n, &address, output.value);
                    }
                }
            }
        }
        state.txs.insert(txid, tx);
        state.mempool.push((txid, Amount::ZERO));
        txid
    }

    /// Confirm everything in the mempool in a new block.
    pub fn mine_block(&self) -> BlockHash {
        let mut state = self.state.lock().unwrap();
        state.height += 1;
        let height = state.height;
        let time = GENESIS_TIME + height * BLOCK_INTERVAL;
        let hash = BlockHash::new(sha256d(format!("block:{height}").as_bytes()));

        // coinbase first, like a real block
        let coinbase = Txid::new(sha256d(format!("coinbase:{height}").as_bytes()));
        let mut tx_ids = vec![coinbase];
        let confirmed: Vec<Txid> = state.mempool.drain(..).map(|(t, _)| t).collect();
        tx_ids.extend(confirmed.iter().copied());

        for txid in &confirmed {
            if let Some(tx) = state.txs.get_mut(txid) {
                tx.blockhash = Some(hash);
                tx.blocktime = Some(time);
            }
        }
        for tx in state.txs.values_mut() {
            if tx.blockhash.is_some() {
                tx.confirmations = Some(tx.confirmations.unwrap_or(0) + 1);
            }
        }
        for utxo in &mut state.utxos {
            utxo.confirmations += 1;
        }

        state.blocks.insert(
            hash,
            BlockInfo {
                hash,
                height,
                time: Timestamp::new(time),
                tx: tx_ids,
            },
        );
        hash
    }

    /// Number of calls made to a [`LedgerNode`] method, by method name.
    pub fn calls(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    pub fn mempool(&self) -> Vec<Txid> {
        self.state
            .lock()
            .unwrap()
            .mempool
            .iter()
            .map(|(t, _)| *t)
            .collect()
    }

    pub fn transaction(&self, txid: &Txid) -> Option<LedgerTransaction> {
        self.state.lock().unwrap().txs.get(txid).cloned()
    }

    pub fn unspent(&self) -> Vec<Utxo> {
        self.state.lock().unwrap().utxos.clone()
    }

    fn enter(&self, method: &'static str) -> Result<std::sync::MutexGuard<'_, State>, LedgerError> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(method).or_default() += 1;
        if state.offline {
            return Err(LedgerError::Unreachable("connection refused".into()));
        }
        Ok(state)
    }
}

impl Default for NullLedgerNode {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    fn fresh_address(&mut self, label: &str) -> Address {
        self.next_address += 1;
        let raw = format!("bcrt1q{label}{:04}", self.next_address);
        self.wallet_addresses.insert(raw.clone());
        Address::new(raw).unwrap()
    }

    fn credit(&mut self, txid: Txid, vout: u32, address: &Address, amount: Amount) -> Utxo {
        let utxo = Utxo {
            txid,
            vout,
            amount,
            address: Some(address.clone()),
            confirmations: 0,
        };
        self.wallet_outputs.insert((txid, vout), utxo.clone());
        self.utxos.push(utxo.clone());
        utxo
    }

    fn mempool_fee(&self, txid: &Txid) -> Option<Amount> {
        self.mempool.iter().find(|(t, _)| t == txid).map(|(_, f)| *f)
    }

    /// Drop `txid` from the mempool, un-crediting its outputs and releasing
    /// its inputs back to the wallet.
    fn evict(&mut self, txid: &Txid) {
        self.mempool.retain(|(t, _)| t != txid);
        self.utxos.retain(|u| u.txid != *txid);
        let Some(tx) = self.txs.remove(txid) else {
            return;
        };
        for input in tx.vin.iter().filter_map(|i| i.to_input()) {
            let outpoint = (input.txid, input.vout);
            if self.spent_by.get(&outpoint) == Some(txid) {
                self.spent_by.remove(&outpoint);
                if let Some(utxo) = self.wallet_outputs.get(&outpoint) {
                    self.utxos.push(utxo.clone());
                }
            }
        }
    }
}

fn sha256d(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(bytes)).into()
}

fn payment_output(n: u32, address: &Address, value: Amount) -> LedgerOutput {
    let program = Sha256::digest(address.as_str().as_bytes());
    LedgerOutput {
        value,
        n,
        script_pub_key: ScriptPubKey {
            kind: "witness_v0_keyhash".into(),
            hex: format!("0014{}", hex::encode(&program[..20])),
            address: Some(address.to_string()),
        },
    }
}

fn data_output(n: u32, payload: &[u8]) -> LedgerOutput {
    let mut script = vec![0x6a];
    if payload.len() > 0x4b {
        script.push(0x4c);
    }
    script.push(payload.len() as u8);
    script.extend_from_slice(payload);
    LedgerOutput {
        value: Amount::ZERO,
        n,
        script_pub_key: ScriptPubKey {
            kind: ScriptPubKey::NULLDATA.into(),
            hex: hex::encode(script),
            address: None,
        },
    }
}

fn decode_draft(raw_hex: &str) -> Result<Draft, LedgerError> {
    let bytes = hex::decode(raw_hex).map_err(|e| LedgerError::Rpc {
        code: -22,
        message: format!("TX decode failed: {e}"),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| LedgerError::Rpc {
        code: -22,
        message: format!("TX decode failed: {e}"),
    })
}

fn rejected(message: &str) -> LedgerError {
    LedgerError::Rpc {
        code: -26,
        message: message.into(),
    }
}

#[async_trait]
impl LedgerNode for NullLedgerNode {
    async fn list_unspent(&self, min_conf: u32) -> Result<Vec<Utxo>, LedgerError> {
        let state = self.enter("list_unspent")?;
        Ok(state
            .utxos
            .iter()
            .filter(|u| u.confirmations >= i64::from(min_conf))
            .cloned()
            .collect())
    }

    async fn get_raw_transaction(&self, txid: &Txid) -> Result<LedgerTransaction, LedgerError> {
        let state = self.enter("get_raw_transaction")?;
        state
            .txs
            .get(txid)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {txid}")))
    }

    async fn get_block(&self, hash: &BlockHash) -> Result<BlockInfo, LedgerError> {
        let state = self.enter("get_block")?;
        state
            .blocks
            .get(hash)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("block {hash}")))
    }

    async fn estimate_fee_rate(&self, target_blocks: u32) -> Result<FeeRate, LedgerError> {
        let state = self.enter("estimate_fee_rate")?;
        state
            .fee_rate
            .ok_or(LedgerError::NoFeeEstimate { target_blocks })
    }

    async fn get_new_address(&self, label: &str) -> Result<Address, LedgerError> {
        let mut state = self.enter("get_new_address")?;
        Ok(state.fresh_address(label))
    }

    async fn create_raw_transaction(
        &self,
        inputs: &[TxInput],
        outputs: &[TxOutput],
    ) -> Result<String, LedgerError> {
        let _state = self.enter("create_raw_transaction")?;
        let draft = Draft {
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        };
        let json = serde_json::to_vec(&draft)
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
        Ok(hex::encode(json))
    }

    async fn sign_raw_transaction(&self, raw_hex: &str) -> Result<String, LedgerError> {
        let state = self.enter("sign_raw_transaction")?;
        let draft = decode_draft(raw_hex)?;
        for input in &draft.inputs {
            if !state.wallet_outputs.contains_key(&(input.txid, input.vout)) {
                return Err(LedgerError::Rpc {
                    code: -4,
                    message: format!("unable to sign input {}:{}", input.txid, input.vout),
                });
            }
        }
        Ok(raw_hex.to_string())
    }

    async fn send_raw_transaction(&self, signed_hex: &str) -> Result<Txid, LedgerError> {
        let mut state = self.enter("send_raw_transaction")?;
        let draft = decode_draft(signed_hex)?;

        let mut total_in = Amount::ZERO;
        let mut conflicts: Vec<Txid> = Vec::new();
        for input in &draft.inputs {
            let outpoint = (input.txid, input.vout);
            let utxo = state.wallet_outputs.get(&outpoint).ok_or_else(|| LedgerError::Rpc {
                code: -25,
                message: "bad-txns-inputs-missingorspent".into(),
            })?;
            total_in = total_in + utxo.amount;
            if let Some(spender) = state.spent_by.get(&outpoint) {
                if state.mempool_fee(spender).is_none() {
                    return Err(LedgerError::Rpc {
                        code: -25,
                        message: "bad-txns-inputs-missingorspent".into(),
                    });
                }
                if !conflicts.contains(spender) {
                    conflicts.push(*spender);
                }
            }
        }

        let total_out: Amount = draft.outputs.iter().map(|o| o.amount()).sum();
        let fee = total_in
            .checked_sub(total_out)
            .ok_or_else(|| rejected("bad-txns-in-belowout"))?;

        if !conflicts.is_empty() {
            let mut replaced_fee = Amount::ZERO;
            for spender in &conflicts {
                let signals = state
                    .txs
                    .get(spender)
                    .is_some_and(|tx| tx.vin.iter().any(|i| i.sequence < 0xffff_fffe));
                if !signals {
                    return Err(rejected("txn-mempool-conflict"));
                }
                replaced_fee = replaced_fee + state.mempool_fee(spender).unwrap_or(Amount::ZERO);
            }
            if fee <= replaced_fee {
                return Err(rejected("insufficient fee"));
            }
            for spender in &conflicts {
                state.evict(spender);
            }
        }

        let txid = Txid::new(sha256d(signed_hex.as_bytes()));
        let mut vout = Vec::with_capacity(draft.outputs.len());
        for (n, output) in draft.outputs.iter().enumerate() {
            let n = n as u32;
            match output {
                TxOutput::Data(payload) => vout.push(data_output(n, payload)),
                TxOutput::Payment { address, amount } => {
                    vout.push(payment_output(n, address, *amount));
                    if state.wallet_addresses.contains(address.as_str()) {
                        state.credit(txid, n, address, *amount);
                    }
                }
            }
        }

        for input in &draft.inputs {
            let outpoint = (input.txid, input.vout);
            state.utxos.retain(|u| (u.txid, u.vout) != outpoint);
            state.spent_by.insert(outpoint, txid);
        }

        state.txs.insert(
            txid,
            LedgerTransaction {
                txid,
                hex: signed_hex.to_string(),
                vin: draft
                    .inputs
                    .iter()
                    .map(|i| LedgerInput {
                        txid: Some(i.txid),
                        vout: Some(i.vout),
                        coinbase: None,
                        sequence: i.sequence,
                    })
                    .collect(),
                vout,
                blockhash: None,
                confirmations: None,
                blocktime: None,
            },
        );
        state.mempool.push((txid, fee));
        Ok(txid)
    }

    async fn get_mempool_entry(&self, txid: &Txid) -> Result<MempoolEntry, LedgerError> {
        let state = self.enter("get_mempool_entry")?;
        let fee = state
            .mempool_fee(txid)
            .ok_or_else(|| LedgerError::NotFound(format!("mempool entry {txid}")))?;
        let vsize = state
            .txs
            .get(txid)
            .map_or(0, |tx| (tx.hex.len() / 2) as u64);
        Ok(MempoolEntry { fee, vsize })
    }

    async fn get_wallet_info(&self) -> Result<WalletInfo, LedgerError> {
        let state = self.enter("get_wallet_info")?;
        let (confirmed, unconfirmed): (Vec<&Utxo>, Vec<&Utxo>) =
            state.utxos.iter().partition(|u| u.confirmations > 0);
        Ok(WalletInfo {
            name: "null".into(),
            balance: confirmed.iter().map(|u| u.amount).sum(),
            unconfirmed_balance: unconfirmed.iter().map(|u| u.amount).sum(),
            tx_count: state.txs.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_with_funds() -> (NullLedgerNode, Utxo) {
        let node = NullLedgerNode::with_fee_rate(1000);
        let utxo = node.fund(Amount::from_sat(10_000));
        (node, utxo)
    }

    #[tokio::test]
    async fn send_spends_and_credits_change() {
        let (node, utxo) = node_with_funds();
        let change = node.get_new_address("auth").await.unwrap();
        let outputs = vec![
            TxOutput::Data(b"hello".to_vec()),
            TxOutput::Payment {
                address: change,
                amount: Amount::from_sat(9_000),
            },
        ];
        let raw = node
            .create_raw_transaction(&[utxo.to_input()], &outputs)
            .await
            .unwrap();
        let signed = node.sign_raw_transaction(&raw).await.unwrap();
        let txid = node.send_raw_transaction(&signed).await.unwrap();

        let unspent = node.list_unspent(0).await.unwrap();
        assert_eq!(unspent.len(), 1);
        assert_eq!(unspent[0].txid, txid);
        assert_eq!(unspent[0].vout, 1);
        assert_eq!(
            node.get_mempool_entry(&txid).await.unwrap().fee,
            Amount::from_sat(1_000)
        );
        let tx = node.get_raw_transaction(&txid).await.unwrap();
        assert!(tx.vout[0].script_pub_key.is_nulldata());
        assert!(!tx.is_confirmed());
    }

    #[tokio::test]
    async fn replacement_needs_higher_fee() {
        let (node, utxo) = node_with_funds();
        let addr = node.get_new_address("auth").await.unwrap();
        let pay = |sat| {
            vec![TxOutput::Payment {
                address: addr.clone(),
                amount: Amount::from_sat(sat),
            }]
        };

        let raw = node
            .create_raw_transaction(&[utxo.to_input()], &pay(9_000))
            .await
            .unwrap();
        let first = node.send_raw_transaction(&raw).await.unwrap();

        let raw = node
            .create_raw_transaction(&[utxo.to_input()], &pay(9_500))
            .await
            .unwrap();
        assert!(node.send_raw_transaction(&raw).await.is_err());

        let raw = node
            .create_raw_transaction(&[utxo.to_input()], &pay(8_000))
            .await
            .unwrap();
        let second = node.send_raw_transaction(&raw).await.unwrap();

        assert_eq!(node.mempool().last(), Some(&second));
        assert!(!node.mempool().contains(&first));
        assert!(node.transaction(&first).is_none());
    }

    #[tokio::test]
    async fn mining_confirms_mempool() {
        let (node, utxo) = node_with_funds();
        let hash = node.mine_block();
        let tx = node.get_raw_transaction(&utxo.txid).await.unwrap();
        assert_eq!(tx.blockhash, Some(hash));

        let block = node.get_block(&hash).await.unwrap();
        assert_eq!(block.height, 1);
        assert_eq!(block.position_of(&utxo.txid), Some(1));
        assert!(node.mempool().is_empty());
    }

    #[tokio::test]
    async fn min_conf_hides_mempool_outputs() {
        let node = NullLedgerNode::new();
        let utxo = node.fund(Amount::from_sat(10_000));
        assert_eq!(node.list_unspent(0).await.unwrap(), vec![utxo.clone()]);
        assert!(node.list_unspent(1).await.unwrap().is_empty());

        node.mine_block();
        let confirmed = node.list_unspent(1).await.unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].confirmations, 1);
    }

    #[tokio::test]
    async fn offline_node_is_unreachable() {
        let node = NullLedgerNode::new();
        node.set_offline(true);
        assert!(matches!(
            node.list_unspent(0).await,
            Err(LedgerError::Unreachable(_))
        ));
        assert_eq!(node.calls("list_unspent"), 1);
    }

    #[tokio::test]
    async fn no_fee_estimate() {
        let node = NullLedgerNode::new();
        assert_eq!(
            node.estimate_fee_rate(3).await,
            Err(LedgerError::NoFeeEstimate { target_blocks: 3 })
        );
    }
}
