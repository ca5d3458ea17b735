//! Nullable content store: metadata served from memory.

use async_trait::async_trait;
use notary_ledger::{ContentError, ContentStore};
use notary_types::Cid;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// An in-memory [`ContentStore`] for testing.
pub struct NullContentStore {
    metadata: Mutex<HashMap<Cid, serde_json::Value>>,
    offline: AtomicBool,
    fetches: AtomicUsize,
}

impl NullContentStore {
    pub fn new() -> Self {
        Self {
            metadata: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Serve `value` as the metadata object of `cid`.
    pub fn put_metadata(&self, cid: &Cid, value: serde_json::Value) {
        self.metadata.lock().unwrap().insert(cid.clone(), value);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `fetch_metadata` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for NullContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for NullContentStore {
    async fn fetch_metadata(&self, cid: &Cid) -> Result<Option<serde_json::Value>, ContentError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(ContentError::Unreachable("connection refused".into()));
        }
        Ok(self.metadata.lock().unwrap().get(cid).cloned())
    }
}
