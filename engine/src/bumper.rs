//! Replace-by-fee for a pending notarization.
//!
//! The replacement keeps every input and the data and stake outputs of the
//! original; only the change shrinks. When the change cannot absorb the
//! higher fee, fresh funding outputs are appended.

use notary_ledger::{ContentStore, LedgerError, LedgerNode};
use notary_types::{
    Address, Amount, LedgerTransaction, NotaryParams, TxInput, TxOutput, Txid, Xid,
    SEQUENCE_REPLACEABLE,
};
use tracing::{debug, info};

use crate::auth_tx::{AuthError, AuthTx};
use crate::builder::{broadcast, AUTH_LABEL};
use crate::classifier::refresh_snapshot;
use crate::error::NotaryError;
use crate::op_return;

/// Output index of the change in transactions this engine builds.
const CHANGE_VOUT: u32 = 2;

/// Fetch `txid` and return the asset it notarizes, failing if it is already
/// confirmed or is not a notarization.
pub async fn pending_asset<N, C>(
    node: &N,
    content: &C,
    params: &NotaryParams,
    txid: &Txid,
) -> Result<(LedgerTransaction, AuthTx), NotaryError>
where
    N: LedgerNode + ?Sized,
    C: ContentStore + ?Sized,
{
    let tx = node.get_raw_transaction(txid).await?;
    if tx.is_confirmed() {
        return Err(NotaryError::AlreadyConfirmed(*txid));
    }
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
    Ok((tx, auth))
}

/// Rebroadcast `txid` paying `new_fee` in total. Returns the replacement's
/// txid.
pub async fn bump_fee<N, C>(
    node: &N,
    content: &C,
    params: &NotaryParams,
    txid: &Txid,
    new_fee: Amount,
) -> Result<Txid, NotaryError>
where
    N: LedgerNode + ?Sized,
    C: ContentStore + ?Sized,
{
    let (tx, auth) = pending_asset(node, content, params, txid).await?;

    let current_fee = node.get_mempool_entry(txid).await?.fee;
    if new_fee <= current_fee {
        return Err(NotaryError::FeeNotIncreased {
            current: current_fee,
            new: new_fee,
        });
    }

    let mut inputs: Vec<TxInput> = tx
        .vin
        .iter()
        .filter_map(|i| i.to_input())
        .map(|i| TxInput {
            sequence: SEQUENCE_REPLACEABLE,
            ..i
        })
        .collect();

    let data = data_output(&tx, params, &auth.xid)?;
    let stake = payment_output(&tx, params.stake_vout)?
        .ok_or_else(|| invalid_tx(txid, "stake output missing"))?;
    let old_change = payment_output(&tx, CHANGE_VOUT)?;

    let old_change_amount = old_change.as_ref().map_or(Amount::ZERO, |c| c.1);
    let mut change = i128::from(old_change_amount.to_sat()) + i128::from(current_fee.to_sat())
        - i128::from(new_fee.to_sat());

    if change < 0 {
        let deficit = change.unsigned_abs();
        let snapshot = refresh_snapshot(node, content, params).await?;
        let used: Vec<(Txid, u32)> = inputs.iter().map(|i| (i.txid, i.vout)).collect();
        let mut added = Amount::ZERO;
        // outputs of the replaced transaction vanish with it
        for utxo in snapshot
            .funds
            .iter()
            .filter(|u| u.txid != *txid && !used.contains(&(u.txid, u.vout)))
        {
            if change >= 0 {
                break;
            }
            inputs.push(utxo.to_input());
            added = added + utxo.amount;
            change += i128::from(utxo.amount.to_sat());
        }
        if change < 0 {
            return Err(NotaryError::InsufficientFunds {
                needed: Amount::from_sat(u64::try_from(deficit).unwrap_or(u64::MAX)),
                available: added,
            });
        }
    }

    let change = Amount::from_sat(u64::try_from(change).unwrap_or(u64::MAX));

    let mut outputs = vec![
        data,
        TxOutput::Payment {
            address: stake.0,
            amount: stake.1,
        },
    ];
    if !change.is_zero() {
        let address = match old_change {
            Some((address, _)) => address,
            None => node.get_new_address(AUTH_LABEL).await?,
        };
        outputs.push(TxOutput::Payment {
            address,
            amount: change,
        });
    }

    info!(
        xid = %auth.xid,
        replaces = %txid,
        current_fee = %current_fee,
        new_fee = %new_fee,
        inputs = inputs.len(),
        %change,
        "bumping fee"
    );

    let replacement = broadcast(node, &inputs, &outputs).await?;
    info!(xid = %auth.xid, replaces = %txid, txid = %replacement, "replacement broadcast");
    Ok(replacement)
}

fn data_output(
    tx: &LedgerTransaction,
    params: &NotaryParams,
    xid: &Xid,
) -> Result<TxOutput, NotaryError> {
    let output = tx
        .output(params.data_vout)
        .ok_or_else(|| invalid_tx(&tx.txid, "data output missing"))?;
    let payload = op_return::pushed_bytes(&output.script_pub_key).map_err(|reason| {
        NotaryError::NotANotarization {
            txid: tx.txid,
            reason,
        }
    })?;
    debug!(%xid, bytes = payload.len(), "reusing data output");
    Ok(TxOutput::Data(payload))
}

fn payment_output(
    tx: &LedgerTransaction,
    vout: u32,
) -> Result<Option<(Address, Amount)>, NotaryError> {
    let Some(output) = tx.output(vout) else {
        return Ok(None);
    };
    let address = output
        .script_pub_key
        .address
        .as_deref()
        .ok_or_else(|| invalid_tx(&tx.txid, &format!("output {vout} has no address")))?;
    let address = Address::new(address).map_err(|e| invalid_tx(&tx.txid, &e.to_string()))?;
    Ok(Some((address, output.value)))
}

fn invalid_tx(txid: &Txid, detail: &str) -> NotaryError {
    LedgerError::InvalidResponse(format!("{txid}: {detail}")).into()
}
