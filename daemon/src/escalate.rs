//! Fee escalation for late notarizations.
//!
//! A deployment notarizes every `frequency_hours`. Once that deadline passes,
//! each further hour adds `bump_rate` to the fee, starting from `min_fee`. A
//! pending transaction is replaced at the new fee; otherwise a fresh
//! notarization goes out with the fee as its ceiling. Fees above `max_fee`
//! are refused and left to the operator.

use notary_engine::{NotarizeOutcome, Notary, NotaryError};
use notary_ledger::{ContentStore, LedgerNode};
use notary_types::{Amount, Timestamp, Txid};
use notary_utils::format_duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::txnlog::TxnLog;

const SECS_PER_HOUR: u64 = 3600;

#[derive(Debug, Error)]
pub enum EscalationError {
    #[error("not yet registered")]
    NotRegistered,

    #[error("Notarization fee {fee} exceeds max {max}. Manual intervention required.")]
    FeeAboveMax { fee: Amount, max: Amount },

    #[error(transparent)]
    Notary(#[from] NotaryError),
}

/// Escalation schedule, in satoshi and hours.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    #[serde(default = "default_frequency_hours")]
    pub frequency_hours: u64,

    #[serde(default = "default_min_fee")]
    pub min_fee: Amount,

    /// Added per hour past the deadline.
    #[serde(default = "default_bump_rate")]
    pub bump_rate: Amount,

    #[serde(default = "default_max_fee")]
    pub max_fee: Amount,
}

fn default_frequency_hours() -> u64 {
    24
}

fn default_min_fee() -> Amount {
    Amount::from_sat(1_000)
}

fn default_bump_rate() -> Amount {
    Amount::from_sat(500)
}

fn default_max_fee() -> Amount {
    Amount::from_sat(50_000)
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            frequency_hours: default_frequency_hours(),
            min_fee: default_min_fee(),
            bump_rate: default_bump_rate(),
            max_fee: default_max_fee(),
        }
    }
}

impl FeePolicy {
    /// Fee for a notarization `hours_late` past its deadline.
    pub fn fee_for_delay(&self, hours_late: u64) -> Result<Amount, EscalationError> {
        let fee = self
            .bump_rate
            .to_sat()
            .saturating_mul(hours_late)
            .saturating_add(self.min_fee.to_sat());
        let fee = Amount::from_sat(fee);
        if fee > self.max_fee {
            return Err(EscalationError::FeeAboveMax {
                fee,
                max: self.max_fee,
            });
        }
        Ok(fee)
    }
}

/// Whole hours in `secs`, rounded to nearest.
pub fn rounded_hours(secs: u64) -> u64 {
    secs.saturating_add(SECS_PER_HOUR / 2) / SECS_PER_HOUR
}

/// What one escalation pass did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Escalation {
    /// The latest certificate is still fresh.
    NotDue { age_hours: u64 },
    Bumped { replaced: Txid, txid: Txid, fee: Amount },
    /// The pending transaction already pays at least this much.
    Unchanged { txid: Txid, fee: Amount },
    Notarized { txid: Txid, fee_limit: Amount },
    UpToDate,
}

/// Run one escalation pass for asset `xid` at content `cid`, updating `log`.
pub async fn escalate<N, C>(
    notary: &Notary<N, C>,
    log: &mut TxnLog,
    xid: &str,
    cid: &str,
    policy: &FeePolicy,
    now: Timestamp,
) -> Result<Escalation, EscalationError>
where
    N: LedgerNode,
    C: ContentStore,
{
    let latest = log.latest.ok_or(EscalationError::NotRegistered)?;
    let tx = notary
        .node()
        .get_raw_transaction(&latest)
        .await
        .map_err(NotaryError::from)?;
    let confirmed_at = Timestamp::new(tx.blocktime.unwrap_or(now.as_secs()));
    let age_secs = confirmed_at.elapsed_since(now);
    let age_hours = rounded_hours(age_secs);

    if age_hours < policy.frequency_hours {
        info!(age = %format_duration(age_secs), "latest certificate still fresh");
        return Ok(Escalation::NotDue { age_hours });
    }

    let hours_late = age_hours - policy.frequency_hours;
    let fee = policy
        .fee_for_delay(hours_late)
        .inspect_err(|e| warn!(hours_late, "{e}"))?;
    info!(hours_late, %fee, "notarization overdue");

    match log.pending {
        Some(pending) => match notary.bump_fee(&pending, fee).await {
            Ok(txid) => {
                log.record_pending(txid);
                Ok(Escalation::Bumped {
                    replaced: pending,
                    txid,
                    fee,
                })
            }
            Err(NotaryError::FeeNotIncreased { .. }) => Ok(Escalation::Unchanged {
                txid: pending,
                fee,
            }),
            Err(e) => Err(e.into()),
        },
        None => match notary.notarize(xid, cid, false, Some(fee)).await? {
            NotarizeOutcome::Broadcast(txid) => {
                log.record_pending(txid);
                Ok(Escalation::Notarized {
                    txid,
                    fee_limit: fee,
                })
            }
            NotarizeOutcome::UpToDate => Ok(Escalation::UpToDate),
        },
    }
}
