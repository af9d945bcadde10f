//! Interface to the OS local-notification scheduler.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{NotificationId, NotifierError, ReminderError, ReminderTime, Weekday, with_timeout};

/// When a notification fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Repeats every week. `weekday` uses host calendar numbering (Sunday = 1).
    Weekly {
        weekday: u8,
        hour: u32,
        minute: Option<u32>,
    },
    /// Fires once on a local calendar date.
    Once {
        date: NaiveDate,
        hour: u32,
        minute: u32,
    },
}

impl Trigger {
    /// Weekly trigger for `weekday`, at `time` or at the default hour.
    pub fn weekly(weekday: Weekday, time: Option<ReminderTime>) -> Self {
        match time {
            Some(time) => Trigger::Weekly {
                weekday: weekday.calendar_number(),
                hour: time.hour(),
                minute: Some(time.minute()),
            },
            None => Trigger::Weekly {
                weekday: weekday.calendar_number(),
                hour: Weekday::DEFAULT_REMINDER_HOUR,
                minute: None,
            },
        }
    }

    /// One-shot trigger on `date` at `time`.
    pub fn once(date: NaiveDate, time: ReminderTime) -> Self {
        Trigger::Once {
            date,
            hour: time.hour(),
            minute: time.minute(),
        }
    }

    pub fn repeats(&self) -> bool {
        matches!(self, Trigger::Weekly { .. })
    }
}

/// What the notification shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Data handed back to the app when the user taps the notification.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub payload: BTreeMap<String, serde_json::Value>,
}

/// A notification to register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: NotificationId,
    pub trigger: Trigger,
    pub content: NotificationContent,
}

impl NotificationRequest {
    /// Request with a freshly generated identifier.
    pub fn new(trigger: Trigger, content: NotificationContent) -> Self {
        Self {
            id: NotificationId::generate(),
            trigger,
            content,
        }
    }
}

/// The host's local notification scheduler.
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Register a notification, returning the id it was registered under.
    async fn register(&self, request: NotificationRequest) -> Result<NotificationId, NotifierError>;

    /// Cancel pending notifications. Unknown ids are ignored.
    async fn cancel(&self, ids: &[NotificationId]);
}

/// Register `request`, waiting at most `limit` for the host to answer.
///
/// A registration that times out may still be accepted afterwards, so its
/// id is cancelled before the timeout is reported.
pub(crate) async fn register_bounded(
    notifier: &dyn NotificationScheduler,
    request: NotificationRequest,
    limit: Duration,
) -> Result<Result<NotificationId, NotifierError>, ReminderError> {
    let id = request.id.clone();
    match with_timeout(limit, "register reminder", notifier.register(request)).await {
        Err(e) => {
            let cancelled = with_timeout(
                limit,
                "cancel unacknowledged reminder",
                notifier.cancel(std::slice::from_ref(&id)),
            )
            .await;
            if let Err(cancel_err) = cancelled {
                warn!(notification = %id, error = %cancel_err, "unacknowledged reminder may still fire");
            }
            Err(e)
        }
        answered => answered,
    }
}
