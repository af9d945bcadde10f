//! Weekly reminder reconciliation.
//!
//! Rescheduling a blog always follows the same protocol:
//!
//! 1. ask for notification permission (only when the new schedule has reminders)
//! 2. cancel every trigger the store remembers for the blog
//! 3. register one weekly trigger per scheduled day
//! 4. store the new ids, replacing the old entry
//!
//! A denied permission stops before step 2, so the old schedule stays intact.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, info, warn};

use crate::locks::BlogLocks;
use crate::notifier::register_bounded;
use crate::{
    Blog, BlogId, NotificationContent, NotificationCopy, NotificationRequest,
    NotificationScheduler, PermissionGate, ReminderConfig, ReminderError, ReminderStore,
    ReminderTime, Schedule, ScheduledReminders, ScheduledWeekday, Trigger, with_timeout,
};

const CATEGORY: &str = "blogging-reminder";
const PAYLOAD_TYPE: &str = "blogging_reminder";

/// Schedules recurring weekly reminders and keeps the store in step with them.
///
/// Cloning is cheap; clones share the same store, collaborators and locks.
#[derive(Clone)]
pub struct BloggingRemindersScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<ReminderStore>,
    notifier: Arc<dyn NotificationScheduler>,
    gate: PermissionGate,
    locks: BlogLocks,
    timeout: Duration,
    copy: NotificationCopy,
}

impl BloggingRemindersScheduler {
    pub fn new(
        store: Arc<ReminderStore>,
        notifier: Arc<dyn NotificationScheduler>,
        gate: PermissionGate,
        config: &ReminderConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                notifier,
                gate,
                locks: BlogLocks::default(),
                timeout: config.operation_timeout(),
                copy: config.copy.clone(),
            }),
        }
    }

    /// Replace the reminders of `blog` with `schedule`.
    ///
    /// Without a `time`, triggers fire at the default hour and the store
    /// records plain weekdays. The work runs on its own task: if the caller
    /// stops waiting, the reconciliation still completes.
    #[tracing::instrument(skip(self, blog), fields(blog = %blog.id))]
    pub async fn schedule(
        &self,
        schedule: Schedule,
        blog: &Blog,
        time: Option<ReminderTime>,
    ) -> Result<(), ReminderError> {
        let inner = Arc::clone(&self.inner);
        let blog = blog.clone();
        tokio::spawn(
            async move { inner.reconcile(schedule, &blog, time).await }
                .instrument(tracing::Span::current()),
        )
        .await
        .map_err(|e| ReminderError::Aborted(e.to_string()))?
    }

    /// Remove every reminder of `blog`.
    pub async fn unschedule(&self, blog: &Blog) -> Result<(), ReminderError> {
        self.schedule(Schedule::None, blog, None).await
    }

    /// Unschedule each blog independently. One failure does not stop the rest.
    pub async fn unschedule_all(&self, blogs: &[Blog]) -> Vec<(BlogId, Result<(), ReminderError>)> {
        let mut results = Vec::with_capacity(blogs.len());
        for blog in blogs {
            let result = self.unschedule(blog).await;
            if let Err(e) = &result {
                warn!(blog = %blog.id, error = %e, "failed to unschedule blog");
            }
            results.push((blog.id.clone(), result));
        }
        results
    }

    /// Registered reminders of `blog` as stored.
    pub async fn scheduled_reminders(&self, blog: &BlogId) -> ScheduledReminders {
        self.inner.store.get(blog).await
    }

    /// Days `blog` is currently reminded on.
    pub async fn schedule_for(&self, blog: &Blog) -> Schedule {
        Schedule::from(&self.inner.store.get(&blog.id).await)
    }

    /// Time reminders fire for `blog`, or the default time.
    pub async fn scheduled_time(&self, blog: &Blog) -> ReminderTime {
        self.inner.store.get(&blog.id).await.time().unwrap_or_default()
    }
}

impl Inner {
    async fn reconcile(
        &self,
        schedule: Schedule,
        blog: &Blog,
        time: Option<ReminderTime>,
    ) -> Result<(), ReminderError> {
        if !schedule.is_none() {
            self.gate.ensure_authorized().await?;
        }

        let _guard = self.locks.acquire(&blog.id).await;

        let stale = self.store.get(&blog.id).await.notification_ids();
        with_timeout(self.timeout, "cancel reminders", self.notifier.cancel(&stale)).await?;
        debug!(count = stale.len(), "cancelled previous reminders");

        let days = schedule.days();
        let mut registered = Vec::with_capacity(days.len());
        for weekday in days {
            let request = NotificationRequest::new(Trigger::weekly(weekday, time), self.content(blog));
            match register_bounded(&*self.notifier, request, self.timeout).await {
                Ok(Ok(notification_id)) => registered.push(ScheduledWeekday {
                    weekday,
                    notification_id,
                }),
                Ok(Err(e)) => warn!(?weekday, error = %e, "failed to register reminder"),
                Err(e) => warn!(?weekday, error = %e, "reminder registration did not finish"),
            }
        }

        let reminders = match schedule {
            Schedule::None => ScheduledReminders::None,
            Schedule::Weekdays(_) => ScheduledReminders::from_registered(registered, time),
        };
        let count = reminders.days().len();
        self.store.set(&blog.id, reminders).await?;

        info!(count, time = ?time.map(|t| t.to_string()), "rescheduled weekly reminders");
        Ok(())
    }

    fn content(&self, blog: &Blog) -> NotificationContent {
        let mut payload = BTreeMap::new();
        payload.insert("type".to_string(), PAYLOAD_TYPE.into());
        payload.insert("blog".to_string(), blog.id.as_str().into());

        NotificationContent {
            title: self.copy.weekly_title.clone(),
            subtitle: blog.title.clone(),
            body: self.copy.weekly_body.clone(),
            category: Some(CATEGORY.to_string()),
            payload,
        }
    }
}
