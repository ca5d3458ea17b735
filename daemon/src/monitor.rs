//! Certifies the pending notarization once it confirms.

use anyhow::Context;
use notary_engine::{Notary, NotaryError};
use notary_ledger::{ContentStore, LedgerNode};
use notary_types::{Txid, Xid};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::txnlog::{write_certificate, TxnLog};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MonitorOutcome {
    /// Nothing waiting for confirmation.
    Idle,
    Pending { txid: Txid },
    Certified { txid: Txid, cert: Xid, path: PathBuf },
}

/// Check the log's pending transaction. A confirmed one gets its certificate
/// written under `data_dir` and becomes the latest; the log is saved.
pub async fn check_pending<N, C>(
    notary: &Notary<N, C>,
    log: &mut TxnLog,
    data_dir: &Path,
) -> anyhow::Result<MonitorOutcome>
where
    N: LedgerNode,
    C: ContentStore,
{
    let Some(txid) = log.pending else {
        return Ok(MonitorOutcome::Idle);
    };

    let cert = match notary.certify(&txid).await {
        Ok(cert) => cert,
        Err(NotaryError::NotYetConfirmed(_)) => {
            debug!(%txid, "still pending");
            return Ok(MonitorOutcome::Pending { txid });
        }
        Err(e) => return Err(e).with_context(|| format!("certifying {txid}")),
    };

    let path = write_certificate(data_dir, &cert)?;
    log.confirm(txid);
    log.save(data_dir)?;
    info!(%txid, cert = %cert.xid, path = %path.display(), "certified");

    Ok(MonitorOutcome::Certified {
        txid,
        cert: cert.xid,
        path,
    })
}
