use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per site id: operations on the same site run one at a
/// time, different sites proceed independently.
#[derive(Debug, Clone, Default)]
pub struct SiteLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl SiteLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, site_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(site_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}
