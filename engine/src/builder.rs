//! Coin selection and notarization transaction construction.
//!
//! A notarization spends the asset's previous stake (for updates) plus enough
//! funding outputs to cover a fresh stake and the fee, and produces
//! `[data, stake, change]`. The change output is omitted when it is zero.

use notary_ledger::{ContentStore, LedgerNode};
use notary_types::{Address, Amount, Cid, NotaryParams, TxInput, TxOutput, Txid, Utxo, Xid};
use serde::Serialize;
use tracing::info;

use crate::classifier::refresh_snapshot;
use crate::error::NotaryError;
use crate::fee::estimate_fee;
use crate::op_return;

/// Address label used for stake and change outputs.
pub const AUTH_LABEL: &str = "auth";

/// A validated notarization request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotarizeRequest {
    pub xid: Xid,
    pub cid: Cid,
    /// `true` for a first registration, `false` for an update.
    pub register: bool,
    /// Fee ceiling in satoshi.
    pub fee_limit: Option<Amount>,
}

impl NotarizeRequest {
    /// Validate both identifiers. Runs before anything touches the node.
    pub fn parse(
        xid: &str,
        cid: &str,
        register: bool,
        fee_limit: Option<Amount>,
    ) -> Result<Self, NotaryError> {
        let xid = xid
            .parse::<Xid>()
            .map_err(|e| NotaryError::InvalidIdentifier(e.to_string()))?;
        let cid = Cid::parse(cid).map_err(|e| NotaryError::InvalidIdentifier(e.to_string()))?;
        Ok(Self {
            xid,
            cid,
            register,
            fee_limit,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "txid", rename_all = "snake_case")]
pub enum NotarizeOutcome {
    /// Transaction broadcast; not yet confirmed.
    Broadcast(Txid),
    /// The asset already carries this cid. Nothing was broadcast.
    UpToDate,
}

/// Inputs chosen for a notarization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub inputs: Vec<TxInput>,
    pub total_in: Amount,
    pub change: Amount,
}

/// First-fit selection: the stake being carried forward (if any) goes first,
/// then funding outputs in listing order until the total covers
/// `stake + fee`.
pub fn select_inputs(
    carried: Option<&Utxo>,
    funds: &[Utxo],
    stake: Amount,
    fee: Amount,
) -> Result<Selection, NotaryError> {
    let needed = stake + fee;
    let mut inputs = Vec::new();
    let mut total_in = Amount::ZERO;

    if let Some(utxo) = carried {
        inputs.push(utxo.to_input());
        total_in = total_in + utxo.amount;
    }

    let mut remaining = funds.iter();
    while total_in < needed {
        let Some(utxo) = remaining.next() else {
            return Err(NotaryError::InsufficientFunds {
                needed,
                available: total_in,
            });
        };
        inputs.push(utxo.to_input());
        total_in = total_in + utxo.amount;
    }

    Ok(Selection {
        inputs,
        total_in,
        change: total_in - needed,
    })
}

/// `[data, stake, change?]` in the fixed output order.
pub fn notarization_outputs(
    payload: Vec<u8>,
    stake: (Address, Amount),
    change: Option<(Address, Amount)>,
) -> Vec<TxOutput> {
    let mut outputs = vec![
        TxOutput::Data(payload),
        TxOutput::Payment {
            address: stake.0,
            amount: stake.1,
        },
    ];
    if let Some((address, amount)) = change.filter(|(_, a)| !a.is_zero()) {
        outputs.push(TxOutput::Payment { address, amount });
    }
    outputs
}

/// Create, sign with the node wallet, and send.
pub async fn broadcast<N>(
    node: &N,
    inputs: &[TxInput],
    outputs: &[TxOutput],
) -> Result<Txid, NotaryError>
where
    N: LedgerNode + ?Sized,
{
    let raw = node.create_raw_transaction(inputs, outputs).await?;
    let signed = node.sign_raw_transaction(&raw).await?;
    Ok(node.send_raw_transaction(&signed).await?)
}

/// Register or update the asset named by `req.xid` so that it points at
/// `req.cid`.
pub async fn notarize<N, C>(
    node: &N,
    content: &C,
    params: &NotaryParams,
    req: &NotarizeRequest,
) -> Result<NotarizeOutcome, NotaryError>
where
    N: LedgerNode + ?Sized,
    C: ContentStore + ?Sized,
{
    let snapshot = refresh_snapshot(node, content, params).await?;
    let current = snapshot.find_asset(&req.xid);

    if let Some(asset) = current {
        if asset.auth.cid == req.cid {
            info!(xid = %req.xid, cid = %req.cid, "asset already up to date");
            return Ok(NotarizeOutcome::UpToDate);
        }
    }

    match (current.is_some(), req.register) {
        (true, true) => {
            return Err(NotaryError::AssetStateConflict(format!(
                "xid already registered: {}",
                req.xid
            )))
        }
        (false, false) => {
            return Err(NotaryError::AssetStateConflict(format!(
                "xid not registered: {}",
                req.xid
            )))
        }
        _ => {}
    }

    let fee = estimate_fee(node, params, req.fee_limit).await?;
    let selection = select_inputs(
        current.map(|a| &a.utxo),
        &snapshot.funds,
        params.stake,
        fee,
    )?;

    let stake_address = node.get_new_address(AUTH_LABEL).await?;
    let change = if selection.change.is_zero() {
        None
    } else {
        Some((node.get_new_address(AUTH_LABEL).await?, selection.change))
    };

    let outputs = notarization_outputs(
        op_return::encode(&req.cid, &req.xid),
        (stake_address, params.stake),
        change,
    );

    info!(
        xid = %req.xid,
        cid = %req.cid,
        update = current.is_some(),
        inputs = selection.inputs.len(),
        total_in = %selection.total_in,
        %fee,
        change = %selection.change,
        "notarizing"
    );

    let txid = broadcast(node, &selection.inputs, &outputs).await?;
    info!(xid = %req.xid, %txid, "notarization broadcast");
    Ok(NotarizeOutcome::Broadcast(txid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary_types::SEQUENCE_REPLACEABLE;

    fn utxo(tag: u8, sat: u64) -> Utxo {
        Utxo {
            txid: Txid::new([tag; 32]),
            vout: 0,
            amount: Amount::from_sat(sat),
            address: None,
            confirmations: 6,
        }
    }

    const STAKE: Amount = NotaryParams::STAKE;

    #[test]
    fn first_fit_stops_at_exact_cover() {
        let funds = [utxo(1, 1000), utxo(2, 611), utxo(3, 50_000)];
        let sel = select_inputs(None, &funds, STAKE, Amount::from_sat(500)).unwrap();
        assert_eq!(sel.inputs.len(), 2);
        assert_eq!(sel.total_in, Amount::from_sat(1611));
        assert_eq!(sel.change, Amount::ZERO);
    }

    #[test]
    fn carried_stake_goes_first() {
        let stake = Utxo {
            vout: 1,
            ..utxo(9, 1111)
        };
        let funds = [utxo(1, 10_000)];
        let sel = select_inputs(Some(&stake), &funds, STAKE, Amount::from_sat(300)).unwrap();
        assert_eq!(sel.inputs[0].txid, Txid::new([9; 32]));
        assert_eq!(sel.inputs[0].vout, 1);
        assert_eq!(sel.change, Amount::from_sat(10_000 - 300));
        assert!(sel.inputs.iter().all(|i| i.sequence == SEQUENCE_REPLACEABLE));
    }

    #[test]
    fn exhausted_funds() {
        let funds = [utxo(1, 500), utxo(2, 500)];
        let err = select_inputs(None, &funds, STAKE, Amount::from_sat(500)).unwrap_err();
        assert_eq!(
            err,
            NotaryError::InsufficientFunds {
                needed: Amount::from_sat(1611),
                available: Amount::from_sat(1000),
            }
        );
    }

    #[test]
    fn zero_change_is_dropped() {
        let addr = Address::new("bcrt1qstake").unwrap();
        let change = Address::new("bcrt1qchange").unwrap();
        let outputs = notarization_outputs(
            vec![1, 2],
            (addr.clone(), STAKE),
            Some((change.clone(), Amount::ZERO)),
        );
        assert_eq!(outputs.len(), 2);

        let outputs = notarization_outputs(
            vec![1, 2],
            (addr, STAKE),
            Some((change, Amount::from_sat(1))),
        );
        assert_eq!(outputs.len(), 3);
        assert!(matches!(outputs[0], TxOutput::Data(_)));
        assert_eq!(outputs[1].amount(), STAKE);
    }

    #[test]
    fn rejects_bad_identifiers() {
        let xid = "d59d815c-1b23-4de4-a6a9-ed8ca1060184";
        let cid = "QmQiqxe6DfgmNj1JTe7Xk2hVQkgEqmMjRy6tuffqcTLJaB";
        assert!(NotarizeRequest::parse(xid, cid, true, None).is_ok());
        assert!(matches!(
            NotarizeRequest::parse(xid, "not-a-cid", true, None),
            Err(NotaryError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            NotarizeRequest::parse("not-a-uuid", cid, true, None),
            Err(NotaryError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn outcome_serializes_with_status() {
        let json = serde_json::to_value(NotarizeOutcome::UpToDate).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "up_to_date" }));
    }
}
