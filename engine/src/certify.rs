//! Certificate derivation for confirmed notarizations.
//!
//! Everything in a certificate is recomputed from the ledger on each call, so
//! certifying the same transaction twice yields identical certificates.

use notary_ledger::{ContentStore, LedgerError, LedgerNode};
use notary_types::certificate::chain_urn;
use notary_types::{Authorization, Certificate, NotaryParams, Txid, Xid};
use tracing::{debug, info};

use crate::auth_tx::{AuthError, AuthTx};
use crate::error::NotaryError;

/// Derive the certificate for a confirmed notarization.
///
/// Unconfirmed transactions fail with `NotYetConfirmed` without touching any
/// block.
pub async fn certify<N, C>(
    node: &N,
    content: &C,
    params: &NotaryParams,
    txid: &Txid,
) -> Result<Certificate, NotaryError>
where
    N: LedgerNode + ?Sized,
    C: ContentStore + ?Sized,
{
    let tx = node.get_raw_transaction(txid).await?;
    let Some(block_hash) = tx.blockhash else {
        debug!(%txid, "not yet confirmed");
        return Err(NotaryError::NotYetConfirmed(*txid));
    };

    let auth = match AuthTx::resolve(&tx, params.data_vout, content).await {
        Ok(auth) => auth,
        Err(AuthError::Invalid(reason)) => {
            return Err(NotaryError::NotANotarization {
                txid: *txid,
                reason,
            })
        }
        Err(AuthError::Content(e)) => return Err(e.into()),
    };

    let block = node.get_block(&block_hash).await?;
    let position = block.position_of(txid).ok_or_else(|| {
        NotaryError::from(LedgerError::InvalidResponse(format!(
            "block {block_hash} does not list {txid}"
        )))
    })?;

    let prev = match tx.first_prev_txid() {
        Some(prev_txid) => predecessor(node, content, params, &auth.xid, &prev_txid).await?,
        None => None,
    };

    let certificate = Certificate {
        xid: auth.xid.certificate_id(txid),
        prev,
        auth: Authorization {
            cid: auth.cid,
            xid: auth.xid,
            op_return: auth.op_return,
            time: block.time.to_iso8601(),
            block_height: block.height,
            block_hash,
            chain_id: chain_urn(
                params.network.ledger_label(),
                block.height,
                position,
                params.data_vout,
            ),
            tx,
        },
    };

    info!(
        %txid,
        xid = %certificate.auth.xid,
        cert = %certificate.xid,
        prev = ?certificate.prev.map(|p| p.to_string()),
        height = block.height,
        "certified"
    );
    Ok(certificate)
}

/// Certificate identity of the preceding notarization of `asset`, if
/// `prev_txid` is one.
///
/// An unknown predecessor, or one that notarizes something else, means the
/// certified transaction is a registration.
async fn predecessor<N, C>(
    node: &N,
    content: &C,
    params: &NotaryParams,
    asset: &Xid,
    prev_txid: &Txid,
) -> Result<Option<Xid>, NotaryError>
where
    N: LedgerNode + ?Sized,
    C: ContentStore + ?Sized,
{
    let prev_tx = match node.get_raw_transaction(prev_txid).await {
        Ok(tx) => tx,
        Err(LedgerError::NotFound(_)) => {
            debug!(%prev_txid, "predecessor not found");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    match AuthTx::resolve(&prev_tx, params.data_vout, content).await {
        Ok(prev) if prev.xid == *asset => Ok(Some(asset.certificate_id(prev_txid))),
        Ok(_) | Err(AuthError::Invalid(_)) => Ok(None),
        Err(AuthError::Content(e)) => Err(e.into()),
    }
}
