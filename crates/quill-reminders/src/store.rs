//! Durable mapping from blog to its registered reminders.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::document::{self, DOCUMENT_VERSION, Document};
use crate::{BlogId, ScheduledReminders, StoreError};

/// On-disk form of the reminder store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RemindersDocument {
    version: u32,
    #[serde(default)]
    reminders: BTreeMap<BlogId, ScheduledReminders>,
}

impl Default for RemindersDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            reminders: BTreeMap::new(),
        }
    }
}

impl Document for RemindersDocument {
    fn version(&self) -> u32 {
        self.version
    }
}

/// Store of the weekly reminders registered for each blog.
///
/// Every `set` rewrites the whole document. The lock is held across the
/// write so snapshots reach disk in the order they were taken.
#[derive(Debug)]
pub struct ReminderStore {
    path: PathBuf,
    doc: Mutex<RemindersDocument>,
}

impl ReminderStore {
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

    /// Reminders stored for `blog`, or `None` if there is no entry.
    pub async fn get(&self, blog: &BlogId) -> ScheduledReminders {
        self.doc
            .lock()
            .await
            .reminders
            .get(blog)
            .cloned()
            .unwrap_or_default()
    }

    /// Blogs that have an entry.
    pub async fn blogs(&self) -> Vec<BlogId> {
        self.doc.lock().await.reminders.keys().cloned().collect()
    }

    /// Replace the entry for `blog` and persist the whole document.
    ///
    /// The in-memory entry is replaced even when the write fails, since it
    /// describes triggers that already exist. The failure is logged and returned.
    pub async fn set(&self, blog: &BlogId, reminders: ScheduledReminders) -> Result<(), StoreError> {
        let mut doc = self.doc.lock().await;
        doc.reminders.insert(blog.clone(), reminders);

        match document::write_atomic(&self.path, &*doc).await {
            Ok(()) => {
                debug!(blog = %blog, "persisted reminders");
                Ok(())
            }
            Err(e) => {
                error!(blog = %blog, path = %self.path.display(), error = %e, "failed to persist reminders");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NotificationId, ReminderTime, ScheduledWeekday, Weekday};
    use pretty_assertions::assert_eq;

    fn weekdays(ids: &[(Weekday, &str)]) -> ScheduledReminders {
        ScheduledReminders::Weekdays(
            ids.iter()
                .map(|(weekday, id)| ScheduledWeekday {
                    weekday: *weekday,
                    notification_id: NotificationId::from(*id),
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_missing_blog_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReminderStore::load(dir.path().join("reminders.json")).await;

        assert_eq!(store.get(&BlogId::from("site-a")).await, ScheduledReminders::None);
        assert!(store.blogs().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        let blog = BlogId::from("https://example.blog");
        let timed = ScheduledReminders::from_registered(
            vec![ScheduledWeekday {
                weekday: Weekday::Tuesday,
                notification_id: NotificationId::from("t"),
            }],
            ReminderTime::new(7, 30),
        );

        {
            let store = ReminderStore::load(&path).await;
            store.set(&blog, weekdays(&[(Weekday::Monday, "m")])).await.unwrap();
            store.set(&blog, timed.clone()).await.unwrap();
        }

        let reopened = ReminderStore::load(&path).await;
        assert_eq!(reopened.get(&blog).await, timed);
        assert_eq!(reopened.blogs().await, vec![blog]);
    }

    #[tokio::test]
    async fn test_entries_are_independent_per_blog() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReminderStore::load(dir.path().join("reminders.json")).await;
        let a = BlogId::from("a");
        let b = BlogId::from("b");

        store.set(&a, weekdays(&[(Weekday::Monday, "1")])).await.unwrap();
        store.set(&b, weekdays(&[(Weekday::Friday, "2")])).await.unwrap();
        store.set(&a, ScheduledReminders::None).await.unwrap();

        assert_eq!(store.get(&a).await, ScheduledReminders::None);
        assert_eq!(store.get(&b).await, weekdays(&[(Weekday::Friday, "2")]));
    }

    #[tokio::test]
    async fn test_corrupt_document_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        std::fs::write(&path, "version = 1").unwrap();

        let store = ReminderStore::load(&path).await;
        assert_eq!(store.get(&BlogId::from("a")).await, ScheduledReminders::None);
    }

    #[tokio::test]
    async fn test_document_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        let store = ReminderStore::load(&path).await;
        store
            .set(&BlogId::from("a"), weekdays(&[(Weekday::Sunday, "s")]))
            .await
            .unwrap();

        let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "version": 1,
                "reminders": {
                    "a": { "weekdays": [{ "weekday": "sunday", "notification_id": "s" }] }
                }
            })
        );
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_and_memory_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        let store = ReminderStore::load(&path).await;

        // A directory in place of the temp file makes the write fail
        std::fs::create_dir(dir.path().join("reminders.json.tmp")).unwrap();

        let blog = BlogId::from("a");
        let reminders = weekdays(&[(Weekday::Monday, "m")]);
        let result = store.set(&blog, reminders.clone()).await;

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert_eq!(store.get(&blog).await, reminders);
    }
}
