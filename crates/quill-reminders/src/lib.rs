//! Blogging reminders for Quill.
//!
//! This crate keeps OS-level local notifications in agreement with the
//! reminder schedule a user picked for each of their sites:
//! - Weekly reminders: one recurring trigger per chosen weekday
//! - Prompt reminders: one-shot triggers carrying a dated writing prompt
//! - Durable bookkeeping of every issued notification id, so reminders can
//!   always be cancelled later
//! - Per-site serialization of rescheduling and bounded waits on every
//!   collaborator call

mod config;
mod content;
mod coordinator;
mod document;
mod error;
mod locks;
mod notifier;
mod permission;
mod prompt;
mod receipts;
mod store;
mod types;
mod weekly;

use std::future::Future;
use std::time::Duration;

pub use config::{NotificationCopy, ReminderConfig, ReminderConfigBuilder};
pub use content::{Clock, Prompt, PromptService, SystemClock};
pub use coordinator::ReminderCoordinator;
pub use document::DOCUMENT_VERSION;
pub use error::{ConfigError, ContentError, NotifierError, ReminderError, StoreError};
pub use notifier::{NotificationContent, NotificationRequest, NotificationScheduler, Trigger};
pub use permission::{PermissionAuthority, PermissionGate};
pub use prompt::{PromptRemindersScheduler, select_prompts, static_reminder_dates};
pub use receipts::{PromptReceipt, PromptReceiptStore};
pub use store::ReminderStore;
pub use types::{
    Blog, BlogId, NotificationId, ReminderTime, Schedule, ScheduledReminders, ScheduledWeekday,
    ScheduledWeekdaysWithTime, Weekday,
};
pub use weekly::BloggingRemindersScheduler;

/// Await `fut`, failing with `Timeout` once `limit` has passed.
pub(crate) async fn with_timeout<F: Future>(
    limit: Duration,
    what: &str,
    fut: F,
) -> Result<F::Output, ReminderError> {
    tokio::time::timeout(limit, fut).await.map_err(|_| {
        ReminderError::Timeout(format!("{what} did not finish within {}s", limit.as_secs()))
    })
}
