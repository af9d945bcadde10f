//! Bookkeeping for prompt reminders.
//!
//! Prompt reminders are one-shot, so each blog owns a batch of notification
//! ids rather than one id per weekday.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::document::{self, DOCUMENT_VERSION, Document};
use crate::{BlogId, NotificationId, ReminderTime, Schedule, StoreError, Weekday};

/// Prompt reminders issued for one blog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptReceipt {
    /// Days the user asked for.
    pub weekdays: BTreeSet<Weekday>,
    /// Time every reminder fires at.
    pub time: ReminderTime,
    /// Every trigger registered for this blog.
    pub notification_ids: Vec<NotificationId>,
}

impl PromptReceipt {
    pub fn schedule(&self) -> Schedule {
        Schedule::Weekdays(self.weekdays.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ReceiptsDocument {
    version: u32,
    #[serde(default)]
    receipts: BTreeMap<BlogId, PromptReceipt>,
}

impl Default for ReceiptsDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            receipts: BTreeMap::new(),
        }
    }
}

impl Document for ReceiptsDocument {
    fn version(&self) -> u32 {
        self.version
    }
}

/// Store of prompt receipts, one entry per blog with live prompt reminders.
#[derive(Debug)]
pub struct PromptReceiptStore {
    path: PathBuf,
    doc: Mutex<ReceiptsDocument>,
}

impl PromptReceiptStore {
    /// Open the store at `path`, healing a missing or corrupt file to an empty store.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doc = document::load_or_heal(&path).await;
        Self {
            path,
            doc: Mutex::new(doc),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, blog: &BlogId) -> Option<PromptReceipt> {
        self.doc.lock().await.receipts.get(blog).cloned()
    }

    /// Replace the receipt for `blog`. An empty batch removes the entry.
    pub async fn set(&self, blog: &BlogId, receipt: PromptReceipt) -> Result<(), StoreError> {
        let mut doc = self.doc.lock().await;
        if receipt.notification_ids.is_empty() {
            doc.receipts.remove(blog);
        } else {
            doc.receipts.insert(blog.clone(), receipt);
        }
        self.persist(blog, &doc).await
    }

    /// Drop the receipt for `blog`, returning what was stored.
    pub async fn remove(&self, blog: &BlogId) -> Result<Option<PromptReceipt>, StoreError> {
        let mut doc = self.doc.lock().await;
        let removed = doc.receipts.remove(blog);
        if removed.is_some() {
            self.persist(blog, &doc).await?;
        }
        Ok(removed)
    }

    async fn persist(&self, blog: &BlogId, doc: &ReceiptsDocument) -> Result<(), StoreError> {
        document::write_atomic(&self.path, doc).await.inspect_err(|e| {
            error!(blog = %blog, path = %self.path.display(), error = %e, "failed to persist prompt receipts");
        })?;
        debug!(blog = %blog, "persisted prompt receipts");
        Ok(())
    }
}
