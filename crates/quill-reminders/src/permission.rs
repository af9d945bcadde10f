//! Notification permission gate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{ReminderError, with_timeout};

/// The host authority that grants local-notification permission.
#[async_trait]
pub trait PermissionAuthority: Send + Sync {
    /// Ask for permission. Returns whether it was granted.
    async fn request_authorization(&self) -> bool;
}

/// Guard consulted before registering any trigger.
///
/// No retries: a denied request fails the current operation and the next
/// `schedule` call asks again.
#[derive(Clone)]
pub struct PermissionGate {
    authority: Arc<dyn PermissionAuthority>,
    timeout: Duration,
}

impl PermissionGate {
    pub fn new(authority: Arc<dyn PermissionAuthority>, timeout: Duration) -> Self {
        Self { authority, timeout }
    }

    /// Fail with `PermissionDenied` unless the authority grants permission in time.
    pub async fn ensure_authorized(&self) -> Result<(), ReminderError> {
        let granted = with_timeout(
            self.timeout,
            "permission request",
            self.authority.request_authorization(),
        )
        .await?;

        if granted {
            debug!("notification permission granted");
            Ok(())
        } else {
            warn!("notification permission denied");
            Err(ReminderError::PermissionDenied)
        }
    }
}
