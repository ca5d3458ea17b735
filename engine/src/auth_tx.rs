//! Decoded authorization view of a ledger transaction.

use notary_ledger::{ContentError, ContentStore};
use notary_types::{Cid, LedgerTransaction, Txid, Xid};
use thiserror::Error;

use crate::op_return::{self, DecodeError, Payload};

/// A transaction that carries a complete `(cid, xid)` notarization payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthTx {
    pub txid: Txid,
    pub cid: Cid,
    pub xid: Xid,
    /// Payload text as stored on-chain; empty for legacy payloads.
    pub op_return: String,
}

/// Resolving a transaction either shows it is not a notarization, or could not
/// finish because the content store was unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error(transparent)]
    Invalid(#[from] DecodeError),

    #[error(transparent)]
    Content(#[from] ContentError),
}

impl AuthTx {
    /// Decode the data output at `data_vout` of `tx`.
    ///
    /// Legacy payloads carry only a CID; their xid is read from the content
    /// store metadata for that CID.
    pub async fn resolve<C>(
        tx: &LedgerTransaction,
        data_vout: u32,
        content: &C,
    ) -> Result<Self, AuthError>
    where
        C: ContentStore + ?Sized,
    {
        let output = tx.output(data_vout).ok_or(DecodeError::MissingOutput)?;

        match op_return::decode(&output.script_pub_key)? {
            Payload::Inline { cid, xid, text } => Ok(Self {
                txid: tx.txid,
                cid,
                xid,
                op_return: text,
            }),
            Payload::Legacy { cid } => {
                let xid = content
                    .fetch_metadata(&cid)
                    .await?
                    .as_ref()
                    .and_then(|meta| meta.get("xid"))
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse::<Xid>().ok())
                    .ok_or_else(|| DecodeError::NoXidInMetadata(cid.clone()))?;
                Ok(Self {
                    txid: tx.txid,
                    cid,
                    xid,
                    op_return: String::new(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary_nullables::NullContentStore;
    use notary_types::{Amount, LedgerOutput, ScriptPubKey};

    const XID: &str = "d59d815c-1b23-4de4-a6a9-ed8ca1060184";
    const CID: &str = "QmQiqxe6DfgmNj1JTe7Xk2hVQkgEqmMjRy6tuffqcTLJaB";

    fn tx_with_data(payload: &[u8]) -> LedgerTransaction {
        LedgerTransaction {
            txid: Txid::new([7; 32]),
            hex: String::new(),
            vin: vec![],
            vout: vec![LedgerOutput {
                value: Amount::ZERO,
                n: 0,
                script_pub_key: ScriptPubKey {
                    kind: ScriptPubKey::NULLDATA.into(),
                    hex: hex::encode(op_return::script_bytes(payload)),
                    address: None,
                },
            }],
            blockhash: None,
            confirmations: None,
            blocktime: None,
        }
    }

    #[tokio::test]
    async fn inline_payload_needs_no_content_store() {
        let cid = Cid::parse(CID).unwrap();
        let xid: Xid = XID.parse().unwrap();
        let tx = tx_with_data(&op_return::encode(&cid, &xid));
        let store = NullContentStore::new();

        let auth = AuthTx::resolve(&tx, 0, &store).await.unwrap();
        assert_eq!(auth.cid, cid);
        assert_eq!(auth.xid, xid);
        assert!(auth.op_return.ends_with(&xid.to_base58()));
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn legacy_payload_reads_xid_from_metadata() {
        let cid = Cid::parse(CID).unwrap();
        let tx = tx_with_data(&bs58::decode(CID).into_vec().unwrap());
        let store = NullContentStore::new();
        store.put_metadata(&cid, serde_json::json!({ "xid": XID, "title": "asset" }));

        let auth = AuthTx::resolve(&tx, 0, &store).await.unwrap();
        assert_eq!(auth.xid, XID.parse().unwrap());
        assert_eq!(auth.op_return, "");
    }

    #[tokio::test]
    async fn legacy_payload_without_metadata_is_invalid() {
        let cid = Cid::parse(CID).unwrap();
        let tx = tx_with_data(&bs58::decode(CID).into_vec().unwrap());
        let store = NullContentStore::new();

        assert_eq!(
            AuthTx::resolve(&tx, 0, &store).await,
            Err(AuthError::Invalid(DecodeError::NoXidInMetadata(cid)))
        );
    }

    #[tokio::test]
    async fn content_store_outage_is_not_a_decode_failure() {
        let tx = tx_with_data(&bs58::decode(CID).into_vec().unwrap());
        let store = NullContentStore::new();
        store.set_offline(true);

        assert!(matches!(
            AuthTx::resolve(&tx, 0, &store).await,
            Err(AuthError::Content(_))
        ));
    }

    #[tokio::test]
    async fn missing_data_output() {
        let mut tx = tx_with_data(b"");
        tx.vout.clear();
        assert_eq!(
            AuthTx::resolve(&tx, 0, &NullContentStore::new()).await,
            Err(AuthError::Invalid(DecodeError::MissingOutput))
        );
    }
}
