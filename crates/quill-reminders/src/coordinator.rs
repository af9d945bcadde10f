//! Routes each blog to weekly or prompt reminders.

use tracing::{debug, warn};

use crate::{
    Blog, BloggingRemindersScheduler, PromptRemindersScheduler, ReminderConfig, ReminderError,
    ReminderTime, Schedule,
};

/// Front door for reminder scheduling.
///
/// A blog uses prompt reminders when prompts are enabled and the blog has a
/// remote site id; otherwise it uses weekly reminders. Scheduling one kind
/// clears the other, so a blog never has both.
#[derive(Clone)]
pub struct ReminderCoordinator {
    weekly: BloggingRemindersScheduler,
    prompts: PromptRemindersScheduler,
    prompts_enabled: bool,
}

impl ReminderCoordinator {
    pub fn new(
        weekly: BloggingRemindersScheduler,
        prompts: PromptRemindersScheduler,
        config: &ReminderConfig,
    ) -> Self {
        Self {
            weekly,
            prompts,
            prompts_enabled: config.prompts_enabled,
        }
    }

    pub fn uses_prompts(&self, blog: &Blog) -> bool {
        self.prompts_enabled && blog.site_id.is_some()
    }

    pub fn weekly(&self) -> &BloggingRemindersScheduler {
        &self.weekly
    }

    pub fn prompts(&self) -> &PromptRemindersScheduler {
        &self.prompts
    }

    #[tracing::instrument(skip(self, blog), fields(blog = %blog.id))]
    pub async fn schedule(
        &self,
        schedule: Schedule,
        blog: &Blog,
        time: Option<ReminderTime>,
    ) -> Result<(), ReminderError> {
        if self.uses_prompts(blog) {
            debug!("routing to prompt reminders");
            self.prompts.schedule(schedule, blog, time).await?;
            self.weekly.unschedule(blog).await
        } else {
            debug!("routing to weekly reminders");
            self.weekly.schedule(schedule, blog, time).await?;
            self.prompts.unschedule(blog).await
        }
    }

    /// Clear both kinds of reminders. Both are attempted; the first error is returned.
    pub async fn unschedule(&self, blog: &Blog) -> Result<(), ReminderError> {
        let weekly = self.weekly.unschedule(blog).await;
        let prompts = self.prompts.unschedule(blog).await;

        if let Err(e) = &weekly {
            warn!(blog = %blog.id, error = %e, "failed to clear weekly reminders");
        }
        if let Err(e) = &prompts {
            warn!(blog = %blog.id, error = %e, "failed to clear prompt reminders");
        }
        weekly.and(prompts)
    }

    pub async fn schedule_for(&self, blog: &Blog) -> Schedule {
        if self.uses_prompts(blog) {
            self.prompts.schedule_for(blog).await
        } else {
            self.weekly.schedule_for(blog).await
        }
    }

    pub async fn scheduled_time(&self, blog: &Blog) -> ReminderTime {
        if self.uses_prompts(blog) {
            self.prompts.scheduled_time(blog).await
        } else {
            self.weekly.scheduled_time(blog).await
        }
    }
}
