//! IPFS HTTP API client, read-only.

use async_trait::async_trait;
use notary_ledger::{ContentError, ContentStore};
use notary_types::Cid;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::RpcError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata file looked up inside directory CIDs.
pub const META_FILE: &str = "meta.json";

/// Error messages the node gives for a path that holds no file.
const MISSING_FILE_MESSAGES: &[&str] = &["no link named", "not found", "is a directory", "not a file"];

/// Client for the `/api/v0/cat` endpoint of an IPFS node.
#[derive(Clone)]
pub struct IpfsClient {
    http: reqwest::Client,
    base_url: String,
}

impl IpfsClient {
    /// Create a client for an API base URL such as `http://127.0.0.1:5001`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| RpcError::Client(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Raw bytes at `path`, or `None` if the node reports there is no file
    /// there. Any other failure is an error.
    async fn cat(&self, path: &str) -> Result<Option<Vec<u8>>, RpcError> {
        let url = format!("{}/api/v0/cat", self.base_url.trim_end_matches('/'));
        debug!(path, "ipfs cat");

        let response = self
            .http
            .post(&url)
            .query(&[("arg", path)])
            .send()
            .await
            .map_err(RpcError::from_reqwest)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(RpcError::from_reqwest)?;
        if status.is_success() {
            return Ok(Some(bytes.to_vec()));
        }
        if is_missing_file(&bytes) {
            debug!(path, status = status.as_u16(), "no file at path");
            return Ok(None);
        }
        Err(RpcError::Status(status.as_u16()))
    }
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(rename = "Message")]
    message: String,
}

/// Whether an error body says the path holds no file, as opposed to the node
/// or a gateway in front of it failing.
pub(crate) fn is_missing_file(body: &[u8]) -> bool {
    serde_json::from_slice::<ApiError>(body).is_ok_and(|e| {
        let message = e.message.to_lowercase();
        MISSING_FILE_MESSAGES.iter().any(|m| message.contains(m))
    })
}

/// The body as a JSON object, if it is one.
pub(crate) fn metadata_from_body(body: &[u8]) -> Option<Value> {
    serde_json::from_slice::<Value>(body)
        .ok()
        .filter(Value::is_object)
}

#[async_trait]
impl ContentStore for IpfsClient {
    async fn fetch_metadata(&self, cid: &Cid) -> Result<Option<Value>, ContentError> {
        let direct = self.cat(cid.as_str()).await?;
        if let Some(meta) = direct.as_deref().and_then(metadata_from_body) {
            return Ok(Some(meta));
        }

        let nested = format!("{cid}/{META_FILE}");
        let nested = self.cat(&nested).await?;
        Ok(nested.as_deref().and_then(metadata_from_body))
    }
}
