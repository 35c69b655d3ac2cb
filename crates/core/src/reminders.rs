//! Reminder dispatch.
//!
//! Delivers pending, due reminders through a [`ReminderNotifier`] and records
//! the outcome on each reminder. A failed delivery is terminal; nothing is
//! rescheduled.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::onboarding::{OnboardingReminder, ReminderStatus};
use crate::store::OnboardingStore;
use crate::types::{DbId, Timestamp};

/// Delivery failure reported by a notifier.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification rejected: {0}")]
    Rejected(String),

    #[error("Notification transport failed: {0}")]
    Transport(String),
}

/// Outbound channel for reminder messages.
#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn notify(&self, reminder: &OnboardingReminder) -> Result<(), NotifyError>;
}

/// Per-reminder outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderDispatchResult {
    pub reminder_id: DbId,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub results: Vec<ReminderDispatchResult>,
    pub summary: DispatchSummary,
}

impl DispatchReport {
    fn push(&mut self, result: ReminderDispatchResult) {
        self.summary.total += 1;
        if result.success {
            self.summary.sent += 1;
        } else {
            self.summary.failed += 1;
        }
        self.results.push(result);
    }
}

pub struct ReminderDispatcher {
    store: Arc<dyn OnboardingStore>,
    notifier: Arc<dyn ReminderNotifier>,
}

impl ReminderDispatcher {
    pub fn new(store: Arc<dyn OnboardingStore>, notifier: Arc<dyn ReminderNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Deliver every pending reminder due at `now`, oldest first.
    ///
    /// Only the initial scan can fail; per-reminder failures are reported in
    /// the returned report.
    pub async fn dispatch_due(&self, now: Timestamp) -> Result<DispatchReport, CoreError> {
        let due = self.store.list_due_reminders(now).await?;
        let mut report = DispatchReport::default();
        for reminder in &due {
            report.push(self.deliver(reminder, now).await);
        }
        if report.summary.total > 0 {
            tracing::info!(
                total = report.summary.total,
                sent = report.summary.sent,
                failed = report.summary.failed,
                "Reminder dispatch finished"
            );
        }
        Ok(report)
    }

    /// Deliver one reminder by id. It must exist and be `pending`.
    pub async fn dispatch_one(&self, id: DbId, now: Timestamp) -> Result<DispatchReport, CoreError> {
        let reminder = self
            .store
            .find_reminder(id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "onboarding_reminder",
                id,
            })?;
        if reminder.status != ReminderStatus::Pending {
            return Err(CoreError::Conflict(format!(
                "Reminder {id} is {} and cannot be sent",
                reminder.status
            )));
        }

        let mut report = DispatchReport::default();
        report.push(self.deliver(&reminder, now).await);
        Ok(report)
    }

    async fn deliver(&self, reminder: &OnboardingReminder, now: Timestamp) -> ReminderDispatchResult {
        match self.notifier.notify(reminder).await {
            Ok(()) => match self.store.mark_reminder_sent(reminder.id, now).await {
                Ok(true) => ReminderDispatchResult {
                    reminder_id: reminder.id,
                    success: true,
                    message: "Reminder sent".to_string(),
                    error: None,
                },
                Ok(false) => {
                    tracing::warn!(reminder_id = reminder.id, "Reminder was handled elsewhere during delivery");
                    ReminderDispatchResult {
                        reminder_id: reminder.id,
                        success: false,
                        message: "Reminder delivered but already handled".to_string(),
                        error: Some("reminder is no longer pending".to_string()),
                    }
                }
                Err(e) => {
                    // Delivered, but the status could not be recorded.
                    tracing::error!(reminder_id = reminder.id, error = %e, "Failed to mark reminder sent");
                    ReminderDispatchResult {
                        reminder_id: reminder.id,
                        success: false,
                        message: "Reminder delivered but status update failed".to_string(),
                        error: Some(e.to_string()),
                    }
                }
            },
            Err(e) => {
                tracing::warn!(reminder_id = reminder.id, error = %e, "Reminder delivery failed");
                let error = e.to_string();
                match self.store.mark_reminder_failed(reminder.id, &error).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::debug!(reminder_id = reminder.id, "Reminder already handled; failure not recorded");
                    }
                    Err(store_err) => {
                        tracing::error!(reminder_id = reminder.id, error = %store_err, "Failed to mark reminder failed");
                    }
                }
                ReminderDispatchResult {
                    reminder_id: reminder.id,
                    success: false,
                    message: "Reminder delivery failed".to_string(),
                    error: Some(error),
                }
            }
        }
    }
}
