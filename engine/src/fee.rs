//! Fee estimation for a notarization transaction.

use notary_ledger::{LedgerError, LedgerNode};
use notary_types::{Amount, FeeRate, NotaryParams};
use tracing::{info, warn};

use crate::error::NotaryError;

/// Fee for one notarization at the node's current estimate, clamped to
/// `ceiling` when one is given.
///
/// No estimate means no fee: the operation fails with `NodeUnavailable`
/// rather than guessing.
pub async fn estimate_fee<N>(
    node: &N,
    params: &NotaryParams,
    ceiling: Option<Amount>,
) -> Result<Amount, NotaryError>
where
    N: LedgerNode + ?Sized,
{
    let rate = node
        .estimate_fee_rate(params.fee_target_blocks)
        .await
        .inspect_err(|e| {
            if let LedgerError::NoFeeEstimate { target_blocks } = e {
                warn!(target_blocks, "node has no fee estimate");
            }
        })?;

    let fee = fee_for(rate, params.assumed_vsize, ceiling);
    info!(rate = %rate, %fee, ceiling = ?ceiling.map(|c| c.to_sat()), "fee estimate");
    Ok(fee)
}

/// `ceil(rate * vsize / 1000)`, clamped to `ceiling`.
pub fn fee_for(rate: FeeRate, vsize: u64, ceiling: Option<Amount>) -> Amount {
    clamp_fee(rate.fee_for_vsize(vsize), ceiling)
}

pub fn clamp_fee(fee: Amount, ceiling: Option<Amount>) -> Amount {
    match ceiling {
        Some(max) if fee > max => max,
        _ => fee,
    }
}
