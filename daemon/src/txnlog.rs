//! On-disk record of the latest confirmed and the pending notarization, plus
//! the certificates written for confirmed ones.
//!
//! Layout under the data directory:
//! - `txnlog.json`: `{"latest": <txid|null>, "pending": <txid|null>}`
//! - `certs/<cert-xid>/meta.json`: one certificate per confirmed notarization

use anyhow::Context;
use notary_types::{Certificate, Txid};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const TXNLOG_FILE: &str = "txnlog.json";
pub const CERTS_DIR: &str = "certs";
pub const CERT_FILE: &str = "meta.json";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnLog {
    pub latest: Option<Txid>,
    pub pending: Option<Txid>,
}

impl TxnLog {
    /// Read the log from `data_dir`, or an empty log if none exists yet.
    pub fn load(data_dir: &Path) -> anyhow::Result<Self> {
        let path = data_dir.join(TXNLOG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Write the log, replacing the previous file only once the new one is
    /// complete.
    pub fn save(&self, data_dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("creating {}", data_dir.display()))?;
        let path = data_dir.join(TXNLOG_FILE);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))
    }

    /// A new or replacement transaction is waiting for confirmation.
    pub fn record_pending(&mut self, txid: Txid) {
        self.pending = Some(txid);
    }

    /// The pending transaction confirmed.
    pub fn confirm(&mut self, txid: Txid) {
        self.latest = Some(txid);
        if self.pending == Some(txid) {
            self.pending = None;
        }
    }
}

/// Path of the certificate file for `cert`.
pub fn certificate_path(data_dir: &Path, cert: &Certificate) -> PathBuf {
    data_dir
        .join(CERTS_DIR)
        .join(cert.xid.to_string())
        .join(CERT_FILE)
}

/// Write `cert` as pretty JSON and return where it went.
pub fn write_certificate(data_dir: &Path, cert: &Certificate) -> anyhow::Result<PathBuf> {
    let path = certificate_path(data_dir, cert);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    std::fs::write(&path, serde_json::to_vec_pretty(cert)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(TxnLog::load(dir.path()).unwrap(), TxnLog::default());
    }

    #[test]
    fn pending_then_confirmed() {
        let dir = tempfile::tempdir().unwrap();
        let first = Txid::new([1; 32]);
        let bumped = Txid::new([2; 32]);

        let mut log = TxnLog::default();
        log.record_pending(first);
        log.record_pending(bumped);
        log.save(dir.path()).unwrap();

        let mut log = TxnLog::load(dir.path()).unwrap();
        assert_eq!(log.pending, Some(bumped));
        log.confirm(bumped);
        log.save(dir.path()).unwrap();

        let log = TxnLog::load(dir.path()).unwrap();
        assert_eq!(log.latest, Some(bumped));
        assert_eq!(log.pending, None);
    }

    #[test]
    fn file_format() {
        let dir = tempfile::tempdir().unwrap();
        let log = TxnLog {
            latest: None,
            pending: Some(Txid::new([0xab; 32])),
        };
        log.save(dir.path()).unwrap();

        let raw = std::fs::read_to_string(dir.path().join(TXNLOG_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(json["latest"].is_null());
        assert_eq!(json["pending"], "ab".repeat(32));
    }

    #[test]
    fn corrupt_log_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TXNLOG_FILE), "{not json").unwrap();
        assert!(TxnLog::load(dir.path()).is_err());
    }
}
