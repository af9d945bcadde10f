//! Prompt reminders.
//!
//! Instead of recurring triggers, prompt reminders register a batch of
//! one-shot notifications for the coming days, each carrying that day's
//! writing prompt. After the last prompt, static "load today's prompt"
//! reminders keep the schedule going until the batch is refreshed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, NaiveDateTime};
use tracing::{Instrument, debug, info, warn};

use crate::locks::BlogLocks;
use crate::notifier::register_bounded;
use crate::{
    Blog, BlogId, Clock, NotificationContent, NotificationCopy, NotificationId,
    NotificationRequest, NotificationScheduler, PermissionGate, Prompt, PromptReceipt,
    PromptReceiptStore, PromptService, ReminderConfig, ReminderError, ReminderTime, Schedule,
    Trigger, Weekday, with_timeout,
};

const CATEGORY: &str = "blogging-prompt";
const PAYLOAD_TYPE: &str = "blogging_prompt";

/// Prompts that should become reminders, in date order.
///
/// A prompt qualifies when it falls on a scheduled weekday and is not in the
/// past. A prompt dated today only qualifies while `time` is still ahead of `now`.
pub fn select_prompts(
    mut prompts: Vec<Prompt>,
    weekdays: &BTreeSet<Weekday>,
    time: ReminderTime,
    now: NaiveDateTime,
) -> Vec<Prompt> {
    let today = now.date();
    prompts.sort_by_key(|prompt| prompt.date);
    prompts
        .into_iter()
        .filter(|prompt| weekdays.contains(&Weekday::from_date(prompt.date)))
        .filter(|prompt| match prompt.date.cmp(&today) {
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => time.is_after(now.time()),
            std::cmp::Ordering::Greater => true,
        })
        .collect()
}

/// Dates of static reminders after `after`, up to and including `after + max_days`.
pub fn static_reminder_dates(
    after: NaiveDate,
    weekdays: &BTreeSet<Weekday>,
    max_days: u32,
) -> Vec<NaiveDate> {
    (1..=u64::from(max_days))
        .filter_map(|offset| after.checked_add_days(Days::new(offset)))
        .filter(|date| weekdays.contains(&Weekday::from_date(*date)))
        .collect()
}

/// Schedules prompt reminders and remembers every id it hands out.
#[derive(Clone)]
pub struct PromptRemindersScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    receipts: Arc<PromptReceiptStore>,
    notifier: Arc<dyn NotificationScheduler>,
    prompts: Arc<dyn PromptService>,
    gate: PermissionGate,
    clock: Arc<dyn Clock>,
    locks: BlogLocks,
    timeout: Duration,
    window_days: u32,
    static_days: u32,
    copy: NotificationCopy,
}

impl PromptRemindersScheduler {
    pub fn new(
        receipts: Arc<PromptReceiptStore>,
        notifier: Arc<dyn NotificationScheduler>,
        prompts: Arc<dyn PromptService>,
        gate: PermissionGate,
        clock: Arc<dyn Clock>,
        config: &ReminderConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                receipts,
                notifier,
                prompts,
                gate,
                clock,
                locks: BlogLocks::default(),
                timeout: config.operation_timeout(),
                window_days: config.prompt_window_days,
                static_days: config.static_reminder_days,
                copy: config.copy.clone(),
            }),
        }
    }

    /// Replace the prompt reminders of `blog`.
    ///
    /// Pending prompt reminders are always cancelled first. `Schedule::None`
    /// stops there.
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
            async move { inner.process(schedule, &blog, time).await }
                .instrument(tracing::Span::current()),
        )
        .await
        .map_err(|e| ReminderError::Aborted(e.to_string()))?
    }

    /// Cancel every pending prompt reminder of `blog`.
    #[tracing::instrument(skip(self, blog), fields(blog = %blog.id))]
    pub async fn unschedule(&self, blog: &Blog) -> Result<(), ReminderError> {
        let inner = Arc::clone(&self.inner);
        let blog_id = blog.id.clone();
        tokio::spawn(
            async move {
                let _guard = inner.locks.acquire(&blog_id).await;
                inner.cancel_pending(&blog_id).await
            }
            .instrument(tracing::Span::current()),
        )
        .await
        .map_err(|e| ReminderError::Aborted(e.to_string()))?
    }

    /// Stored bookkeeping for `blog`.
    pub async fn receipt(&self, blog: &BlogId) -> Option<PromptReceipt> {
        self.inner.receipts.get(blog).await
    }

    /// Days `blog` gets prompt reminders on.
    pub async fn schedule_for(&self, blog: &Blog) -> Schedule {
        self.receipt(&blog.id)
            .await
            .map(|receipt| receipt.schedule())
            .unwrap_or_default()
    }

    /// Time prompt reminders fire for `blog`, or the default time.
    pub async fn scheduled_time(&self, blog: &Blog) -> ReminderTime {
        self.receipt(&blog.id)
            .await
            .map(|receipt| receipt.time)
            .unwrap_or_default()
    }
}

impl Inner {
    async fn process(
        &self,
        schedule: Schedule,
        blog: &Blog,
        time: Option<ReminderTime>,
    ) -> Result<(), ReminderError> {
        if !schedule.is_none() {
            self.gate.ensure_authorized().await?;
        }

        let _guard = self.locks.acquire(&blog.id).await;
        self.cancel_pending(&blog.id).await?;

        let Schedule::Weekdays(weekdays) = schedule else {
            return Ok(());
        };

        let site_id = blog
            .site_id
            .ok_or_else(|| ReminderError::InvalidSite(format!("{} has no site id", blog.id)))?;

        let time = time.unwrap_or_default();
        let now = self.clock.now();
        let prompts = with_timeout(
            self.timeout,
            "fetch prompts",
            self.prompts.fetch_prompts(site_id, now.date(), self.window_days),
        )
        .await??;
        let fetched = prompts.len();

        let mut notification_ids = Vec::new();
        let mut last_prompt_date = None;
        for prompt in select_prompts(prompts, &weekdays, time, now) {
            let content = self.content(blog, site_id, Some(&prompt));
            if let Some(id) = self.register(Trigger::once(prompt.date, time), content).await {
                notification_ids.push(id);
                last_prompt_date = Some(prompt.date);
            }
        }
        let prompt_count = notification_ids.len();

        let after = last_prompt_date.unwrap_or_else(|| now.date());
        for date in static_reminder_dates(after, &weekdays, self.static_days) {
            let content = self.content(blog, site_id, None);
            if let Some(id) = self.register(Trigger::once(date, time), content).await {
                notification_ids.push(id);
            }
        }
        let static_count = notification_ids.len() - prompt_count;

        self.receipts
            .set(
                &blog.id,
                PromptReceipt {
                    weekdays,
                    time,
                    notification_ids,
                },
            )
            .await?;

        info!(
            fetched,
            prompt_count,
            static_count,
            time = %time,
            "scheduled prompt reminders"
        );
        Ok(())
    }

    async fn cancel_pending(&self, blog: &BlogId) -> Result<(), ReminderError> {
        let Some(receipt) = self.receipts.get(blog).await else {
            return Ok(());
        };

        with_timeout(
            self.timeout,
            "cancel prompt reminders",
            self.notifier.cancel(&receipt.notification_ids),
        )
        .await?;
        self.receipts.remove(blog).await?;

        debug!(count = receipt.notification_ids.len(), "cancelled prompt reminders");
        Ok(())
    }

    /// Register one reminder. Failures are logged and skipped.
    async fn register(&self, trigger: Trigger, content: NotificationContent) -> Option<NotificationId> {
        let request = NotificationRequest::new(trigger, content);
        match register_bounded(&*self.notifier, request, self.timeout).await {
            Ok(Ok(id)) => Some(id),
            Ok(Err(e)) => {
                warn!(error = %e, "failed to register prompt reminder");
                None
            }
            Err(e) => {
                warn!(error = %e, "prompt reminder registration did not finish");
                None
            }
        }
    }

    fn content(&self, blog: &Blog, site_id: u64, prompt: Option<&Prompt>) -> NotificationContent {
        let mut payload = BTreeMap::new();
        payload.insert("type".to_string(), PAYLOAD_TYPE.into());
        payload.insert("site_id".to_string(), site_id.into());

        let body = match prompt {
            Some(prompt) => {
                payload.insert("prompt_id".to_string(), prompt.id.into());
                prompt.text.clone()
            }
            None => self.copy.static_prompt_body.clone(),
        };

        NotificationContent {
            title: self.copy.prompt_title.clone(),
            subtitle: blog.title.clone(),
            body,
            category: Some(CATEGORY.to_string()),
            payload,
        }
    }
}
