//! Wallet UTXO classification.
//!
//! Every unspent output is either funding (freely spendable) or the stake of a
//! notarized asset. Only outputs at the stake index can be stakes, so only
//! those cost a transaction lookup.

use notary_ledger::{ContentStore, LedgerNode};
use notary_types::{Amount, NotaryParams, Utxo, Xid};
use tracing::{debug, info};

use crate::auth_tx::{AuthError, AuthTx};
use crate::error::NotaryError;

/// Mempool outputs count: an unconfirmed stake is already the asset's current
/// state, and unconfirmed change funds the next notarization.
pub const UNSPENT_MIN_CONF: u32 = 0;

/// The stake output of a notarized asset together with its decoded payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetUtxo {
    pub utxo: Utxo,
    pub auth: AuthTx,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassifiedUtxo {
    Funding(Utxo),
    Asset(AssetUtxo),
}

/// Wallet state for one operation. Never cached across operations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletSnapshot {
    pub staked_total: Amount,
    pub spendable_total: Amount,
    /// Funding outputs in wallet listing order.
    pub funds: Vec<Utxo>,
    /// Asset stakes in wallet listing order.
    pub assets: Vec<AssetUtxo>,
}

impl WalletSnapshot {
    pub fn from_classified(items: impl IntoIterator<Item = ClassifiedUtxo>) -> Self {
        let mut snapshot = Self::default();
        for item in items {
            match item {
                ClassifiedUtxo::Funding(utxo) => {
                    snapshot.spendable_total = snapshot.spendable_total + utxo.amount;
                    snapshot.funds.push(utxo);
                }
                ClassifiedUtxo::Asset(asset) => {
                    snapshot.staked_total = snapshot.staked_total + asset.utxo.amount;
                    snapshot.assets.push(asset);
                }
            }
        }
        snapshot
    }

    /// The current stake of `xid`, if the asset is notarized.
    pub fn find_asset(&self, xid: &Xid) -> Option<&AssetUtxo> {
        self.assets.iter().find(|a| a.auth.xid == *xid)
    }
}

/// Classify one wallet output.
///
/// A stake-index output whose transaction does not decode is funding. A
/// content-store outage while resolving a legacy payload fails the whole
/// classification instead of silently demoting the stake to funding.
pub async fn classify_utxo<N, C>(
    node: &N,
    content: &C,
    params: &NotaryParams,
    utxo: Utxo,
) -> Result<ClassifiedUtxo, NotaryError>
where
    N: LedgerNode + ?Sized,
    C: ContentStore + ?Sized,
{
    if utxo.vout != params.stake_vout {
        return Ok(ClassifiedUtxo::Funding(utxo));
    }

    let tx = node.get_raw_transaction(&utxo.txid).await?;
    match AuthTx::resolve(&tx, params.data_vout, content).await {
        Ok(auth) => Ok(ClassifiedUtxo::Asset(AssetUtxo { utxo, auth })),
        Err(AuthError::Invalid(reason)) => {
            debug!(txid = %utxo.txid, %reason, "stake-index output is not a notarization");
            Ok(ClassifiedUtxo::Funding(utxo))
        }
        Err(AuthError::Content(e)) => Err(e.into()),
    }
}

/// List and classify the wallet's unspent outputs.
pub async fn refresh_snapshot<N, C>(
    node: &N,
    content: &C,
    params: &NotaryParams,
) -> Result<WalletSnapshot, NotaryError>
where
    N: LedgerNode + ?Sized,
    C: ContentStore + ?Sized,
{
    let utxos = node.list_unspent(UNSPENT_MIN_CONF).await?;
    let mut classified = Vec::with_capacity(utxos.len());
    for utxo in utxos {
        classified.push(classify_utxo(node, content, params, utxo).await?);
    }

    let snapshot = WalletSnapshot::from_classified(classified);
    info!(
        funds = snapshot.funds.len(),
        assets = snapshot.assets.len(),
        spendable = %snapshot.spendable_total,
        staked = %snapshot.staked_total,
        "wallet snapshot"
    );
    Ok(snapshot)
}
