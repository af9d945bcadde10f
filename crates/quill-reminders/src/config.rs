//! Reminder service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

// Validation limits
const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 600;
const MAX_WINDOW_DAYS: u32 = 62;

/// Configuration for the reminder schedulers.
///
/// # Examples
///
/// ```rust
/// use quill_reminders::ReminderConfig;
///
/// let config = ReminderConfig::builder()
///     .data_dir("/tmp/quill")
///     .operation_timeout_secs(10)
///     .prompts_enabled(true)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.prompt_window_days, 15);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Directory holding both reminder documents.
    pub data_dir: PathBuf,

    /// File name of the weekly reminder store.
    pub reminders_file: String,

    /// File name of the prompt receipt store.
    pub prompt_receipts_file: String,

    /// Upper bound for each call into a collaborator (permission, cancel, register, fetch).
    pub operation_timeout_secs: u64,

    /// Number of days of prompts fetched and scheduled, starting today.
    pub prompt_window_days: u32,

    /// Days of static follow-up reminders after the last prompt reminder.
    pub static_reminder_days: u32,

    /// Route sites with a remote site id to prompt reminders.
    pub prompts_enabled: bool,

    /// Notification text.
    pub copy: NotificationCopy,
}

/// Text shown in reminder notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationCopy {
    pub weekly_title: String,
    pub weekly_body: String,
    pub prompt_title: String,
    pub static_prompt_body: String,
}

impl Default for NotificationCopy {
    fn default() -> Self {
        Self {
            weekly_title: "Blogging Reminder".to_string(),
            weekly_body: "It's time to write! Publish something new today.".to_string(),
            prompt_title: "Today's Prompt 💡".to_string(),
            static_prompt_body: "Tap to load today's prompt...".to_string(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            reminders_file: "blogging-reminders.json".to_string(),
            prompt_receipts_file: "prompt-reminders.json".to_string(),
            operation_timeout_secs: 30,
            prompt_window_days: 15,
            static_reminder_days: 14,
            prompts_enabled: false,
            copy: NotificationCopy::default(),
        }
    }
}

impl ReminderConfig {
    pub fn builder() -> ReminderConfigBuilder {
        ReminderConfigBuilder::new()
    }

    /// Platform data directory for Quill, falling back to the working directory.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quill")
    }

    /// Read and validate a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn reminders_path(&self) -> PathBuf {
        self.data_dir.join(&self.reminders_file)
    }

    pub fn prompt_receipts_path(&self) -> PathBuf {
        self.data_dir.join(&self.prompt_receipts_file)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&self.operation_timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "operation timeout must be between {MIN_TIMEOUT_SECS} and {MAX_TIMEOUT_SECS} seconds (got {})",
                self.operation_timeout_secs
            )));
        }

        if self.prompt_window_days == 0 || self.prompt_window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::Invalid(format!(
                "prompt window must be between 1 and {MAX_WINDOW_DAYS} days (got {})",
                self.prompt_window_days
            )));
        }

        if self.static_reminder_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::Invalid(format!(
                "static reminder window must be at most {MAX_WINDOW_DAYS} days (got {})",
                self.static_reminder_days
            )));
        }

        if self.reminders_file.is_empty() || self.prompt_receipts_file.is_empty() {
            return Err(ConfigError::Invalid("store file names cannot be empty".to_string()));
        }

        if self.reminders_file == self.prompt_receipts_file {
            return Err(ConfigError::Invalid(
                "weekly and prompt stores must use different files".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`ReminderConfig`].
pub struct ReminderConfigBuilder {
    config: ReminderConfig,
}

impl Default for ReminderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReminderConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ReminderConfig::default(),
        }
    }

    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    #[must_use]
    pub fn reminders_file(mut self, name: impl Into<String>) -> Self {
        self.config.reminders_file = name.into();
        self
    }

    #[must_use]
    pub fn prompt_receipts_file(mut self, name: impl Into<String>) -> Self {
        self.config.prompt_receipts_file = name.into();
        self
    }

    #[must_use]
    pub fn operation_timeout_secs(mut self, secs: u64) -> Self {
        self.config.operation_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn prompt_window_days(mut self, days: u32) -> Self {
        self.config.prompt_window_days = days;
        self
    }

    #[must_use]
    pub fn static_reminder_days(mut self, days: u32) -> Self {
        self.config.static_reminder_days = days;
        self
    }

    #[must_use]
    pub fn prompts_enabled(mut self, enabled: bool) -> Self {
        self.config.prompts_enabled = enabled;
        self
    }

    #[must_use]
    pub fn copy(mut self, copy: NotificationCopy) -> Self {
        self.config.copy = copy;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<ReminderConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
