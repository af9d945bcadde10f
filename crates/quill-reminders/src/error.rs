//! Error types for reminder scheduling.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the reminder schedulers.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// The schedule needs notifications but the user declined the permission prompt.
    #[error("permission for push notifications is required")]
    PermissionDenied,

    /// The store could not write the new reminder state.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// The site cannot receive prompt reminders.
    #[error("invalid site: {0}")]
    InvalidSite(String),

    /// The prompt service failed with a reason.
    #[error("content fetch failed: {0}")]
    ContentFetch(String),

    /// A collaborator failed without giving a reason.
    #[error("unknown error")]
    Unknown,

    /// A collaborator did not answer in time.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The reconciliation task stopped before reporting a result.
    #[error("reconciliation aborted: {0}")]
    Aborted(String),
}

/// Errors from reading or writing a reminder document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reported by the OS notification scheduler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifierError {
    /// The scheduler refused the request.
    #[error("notification request rejected: {0}")]
    Rejected(String),

    /// The scheduler is not reachable.
    #[error("notification scheduler unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by the prompt content service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    /// The service failed with a message.
    #[error("{0}")]
    Service(String),

    /// The service failed without saying why.
    #[error("unspecified content service failure")]
    Unspecified,
}

impl From<ContentError> for ReminderError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Service(message) => ReminderError::ContentFetch(message),
            ContentError::Unspecified => ReminderError::Unknown,
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is outside its accepted range.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
