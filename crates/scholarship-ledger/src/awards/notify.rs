use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{AwardTier, Semester};

/// Payload for an "award approved" message to the student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardNotice {
    pub email: String,
    pub name: String,
    pub tier: AwardTier,
    pub amount: u64,
    pub semester: Semester,
}

/// Payload for a "stipend application rejected" message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionNotice {
    pub email: String,
    pub name: String,
    pub tier: AwardTier,
    pub semester: Semester,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Outbound notification hook (mail relay, queue, ...).
pub trait AwardNotifier: Send + Sync {
    fn notify_award_approved(&self, notice: &AwardNotice) -> Result<(), NotifyError>;
    fn notify_application_rejected(&self, notice: &RejectionNotice) -> Result<(), NotifyError>;
}

/// Notifier that writes each message as a structured log event.
#[derive(Debug, Clone)]
pub struct TracingNotifier {
    sender: String,
}

impl TracingNotifier {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

impl AwardNotifier for TracingNotifier {
    fn notify_award_approved(&self, notice: &AwardNotice) -> Result<(), NotifyError> {
        info!(
            from = %self.sender,
            to = %notice.email,
            tier = %notice.tier,
            amount = notice.amount,
            semester = %notice.semester,
            "award approval notice sent"
        );
        Ok(())
    }

    fn notify_application_rejected(&self, notice: &RejectionNotice) -> Result<(), NotifyError> {
        info!(
            from = %self.sender,
            to = %notice.email,
            tier = %notice.tier,
            semester = %notice.semester,
            "stipend rejection notice sent"
        );
        Ok(())
    }
}

/// Best-effort front for a notifier: failures are logged and dropped, and a
/// disabled gate skips delivery entirely.
pub struct NotificationGate<N> {
    notifier: Arc<N>,
    enabled: bool,
}

impl<N> Clone for NotificationGate<N> {
    fn clone(&self) -> Self {
        Self {
            notifier: Arc::clone(&self.notifier),
            enabled: self.enabled,
        }
    }
}

impl<N: AwardNotifier> NotificationGate<N> {
    pub fn new(notifier: Arc<N>, enabled: bool) -> Self {
        Self { notifier, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn award_approved(&self, notice: AwardNotice) {
        if !self.enabled {
            info!(to = %notice.email, "notifications disabled; skipping award notice");
            return;
        }
        if let Err(error) = self.notifier.notify_award_approved(&notice) {
            warn!(%error, to = %notice.email, "failed to deliver award notice");
        }
    }

    pub fn application_rejected(&self, notice: RejectionNotice) {
        if !self.enabled {
            info!(to = %notice.email, "notifications disabled; skipping rejection notice");
            return;
        }
        if let Err(error) = self.notifier.notify_application_rejected(&notice) {
            warn!(%error, to = %notice.email, "failed to deliver rejection notice");
        }
    }
}
