//! The engine's public surface.

use notary_ledger::{ContentStore, LedgerNode};
use notary_types::{Address, Amount, Certificate, NotaryParams, Txid, WalletInfo};
use serde::Serialize;
use tracing::info;

use crate::builder::{self, NotarizeOutcome, NotarizeRequest};
use crate::bumper;
use crate::certify;
use crate::classifier::{refresh_snapshot, WalletSnapshot};
use crate::error::NotaryError;
use crate::fee::estimate_fee;
use crate::locks::XidLocks;

/// Address label for funding deposits.
pub const RECV_LABEL: &str = "recv";

/// Wallet status as presented to an operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WalletReport {
    pub wallet: WalletInfo,
    /// Current per-notarization fee estimate.
    pub fee: Amount,
    pub stake: Amount,
    pub staked: Amount,
    pub spendable: Amount,
    /// Notarizations the spendable balance pays for at the current fee.
    pub notarizations: u64,
    /// Fresh funding address.
    pub address: Address,
}

/// Notarization engine bound to a ledger node and a content store.
pub struct Notary<N, C> {
    node: N,
    content: C,
    params: NotaryParams,
    locks: XidLocks,
}

impl<N, C> Notary<N, C>
where
    N: LedgerNode,
    C: ContentStore,
{
    pub fn new(node: N, content: C, params: NotaryParams) -> Self {
        Self {
            node,
            content,
            params,
            locks: XidLocks::new(),
        }
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn params(&self) -> &NotaryParams {
        &self.params
    }

    /// Point asset `xid` at `cid`, registering it when `register` is set.
    ///
    /// Identifiers are validated before the node is contacted. A `fee_limit`
    /// caps the fee in satoshi.
    pub async fn notarize(
        &self,
        xid: &str,
        cid: &str,
        register: bool,
        fee_limit: Option<Amount>,
    ) -> Result<NotarizeOutcome, NotaryError> {
        let req = NotarizeRequest::parse(xid, cid, register, fee_limit)?;
        info!(xid = %req.xid, cid = %req.cid, register, "notarize");

        let _guard = self.locks.lock(&req.xid).await;
        builder::notarize(&self.node, &self.content, &self.params, &req).await
    }

    /// Replace pending `txid` with a copy paying `new_fee`.
    pub async fn bump_fee(&self, txid: &Txid, new_fee: Amount) -> Result<Txid, NotaryError> {
        let (_, auth) =
            bumper::pending_asset(&self.node, &self.content, &self.params, txid).await?;
        info!(%txid, xid = %auth.xid, %new_fee, "bump fee");

        let _guard = self.locks.lock(&auth.xid).await;
        bumper::bump_fee(&self.node, &self.content, &self.params, txid, new_fee).await
    }

    pub async fn certify(&self, txid: &Txid) -> Result<Certificate, NotaryError> {
        certify::certify(&self.node, &self.content, &self.params, txid).await
    }

    pub async fn wallet_snapshot(&self) -> Result<WalletSnapshot, NotaryError> {
        refresh_snapshot(&self.node, &self.content, &self.params).await
    }

    pub async fn wallet_report(&self) -> Result<WalletReport, NotaryError> {
        let wallet = self.node.get_wallet_info().await?;
        let fee = estimate_fee(&self.node, &self.params, None).await?;
        let snapshot = self.wallet_snapshot().await?;
        let address = self.funding_address().await?;

        let per_notarization = (fee + self.params.stake).to_sat().max(1);
        Ok(WalletReport {
            wallet,
            fee,
            stake: self.params.stake,
            staked: snapshot.staked_total,
            spendable: snapshot.spendable_total,
            notarizations: snapshot.spendable_total.to_sat() / per_notarization,
            address,
        })
    }

    /// Fresh wallet address for deposits.
    pub async fn funding_address(&self) -> Result<Address, NotaryError> {
        Ok(self.node.get_new_address(RECV_LABEL).await?)
    }
}
