//! Per-blog mutual exclusion.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::BlogId;

/// One async mutex per blog, created on first use.
///
/// Entries are never removed, so the map holds one lock for every distinct
/// blog seen since startup.
#[derive(Debug, Clone, Default)]
pub(crate) struct BlogLocks {
    locks: Arc<DashMap<BlogId, Arc<Mutex<()>>>>,
}

impl BlogLocks {
    /// Wait for exclusive access to `blog`.
    pub(crate) async fn acquire(&self, blog: &BlogId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(blog.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
