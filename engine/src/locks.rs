//! Per-asset serialization of notarize and bump.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use notary_types::Xid;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per xid, created on first use.
///
/// Two operations on the same asset would otherwise race to spend the same
/// stake output. Operations on different assets run concurrently. Entries
/// nobody holds or waits on are dropped on the next call to [`lock`].
///
/// [`lock`]: XidLocks::lock
#[derive(Debug, Default)]
pub struct XidLocks {
    inner: Mutex<HashMap<Xid, Arc<AsyncMutex<()>>>>,
}

impl XidLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `xid`. Released when the guard drops.
    pub async fn lock(&self, xid: &Xid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            // only the map's own reference left: idle
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(map.entry(*xid).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of assets currently tracked.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
