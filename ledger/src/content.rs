//! Content-store collaborator.

use async_trait::async_trait;
use notary_types::Cid;

use crate::error::ContentError;

/// Read access to the content store.
///
/// Only needed for legacy payloads, which carry a bare CID and leave the
/// asset xid in the metadata object the CID points at.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the JSON metadata object for `cid`, falling back to
    /// `<cid>/meta.json` for directory CIDs. `Ok(None)` when neither exists
    /// or neither is JSON.
    async fn fetch_metadata(&self, cid: &Cid) -> Result<Option<serde_json::Value>, ContentError>;
}
