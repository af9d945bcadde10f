//! Prompt content service and wall clock.

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::ContentError;

/// A dated writing prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: u64,
    /// Local calendar date the prompt belongs to.
    pub date: NaiveDate,
    pub text: String,
}

/// Source of daily writing prompts for a site.
#[async_trait]
pub trait PromptService: Send + Sync {
    /// Fetch up to `count` prompts starting at `from`.
    async fn fetch_prompts(
        &self,
        site_id: u64,
        from: NaiveDate,
        count: u32,
    ) -> Result<Vec<Prompt>, ContentError>;
}

/// Current local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Clock backed by the system's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
