//! Store seams injected into the validation engine, the automation
//! scheduler and the reminder dispatcher.
//!
//! Postgres implementations live in `lyc-db`; in-memory implementations for
//! tests and local development live in [`crate::memory`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::automation::{AutomationLogEntry, NewAutomationLogEntry};
use crate::error::StoreError;
use crate::license::{DerivedLicenseFields, License};
use crate::onboarding::{
    NewOnboardingReminder, NewOnboardingSession, OnboardingProgress, OnboardingReminder,
    OnboardingSession, OnboardingTemplate, ProgressDraft,
};
use crate::types::{DbId, Timestamp};
use crate::validation::usage::UsageCounts;

/// Read access to license records and write access to their derived fields.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Look up a license by its opaque key, whatever its status.
    async fn find_by_key(&self, license_key: &str) -> Result<Option<License>, StoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<License>, StoreError>;

    /// Overwrite enabled plugins, access level and time-limit fields.
    async fn update_derived_fields(
        &self,
        id: DbId,
        fields: &DerivedLicenseFields,
    ) -> Result<Option<License>, StoreError>;
}

/// Onboarding progress, session, reminder, template and audit records.
#[async_trait]
pub trait OnboardingStore: Send + Sync {
    // --- Progress ---

    async fn find_progress(
        &self,
        user_id: &str,
        license_id: DbId,
    ) -> Result<Option<OnboardingProgress>, StoreError>;

    /// Whether the user has a `completed` progress row for any license.
    async fn has_completed_onboarding(&self, user_id: &str) -> Result<bool, StoreError>;

    async fn insert_progress(&self, draft: &ProgressDraft) -> Result<OnboardingProgress, StoreError>;

    async fn update_progress(
        &self,
        id: DbId,
        draft: &ProgressDraft,
    ) -> Result<OnboardingProgress, StoreError>;

    // --- Sessions ---

    /// Sessions for a (user, license) pair ordered by session number.
    async fn list_sessions(
        &self,
        user_id: &str,
        license_id: DbId,
    ) -> Result<Vec<OnboardingSession>, StoreError>;

    async fn find_session(&self, id: DbId) -> Result<Option<OnboardingSession>, StoreError>;

    async fn create_session(
        &self,
        session: &NewOnboardingSession,
    ) -> Result<OnboardingSession, StoreError>;

    /// Mark a session completed. Returns `None` if it does not exist.
    async fn complete_session(
        &self,
        id: DbId,
        completed_at: Timestamp,
    ) -> Result<Option<OnboardingSession>, StoreError>;

    // --- Templates ---

    /// Active templates, ordered by `priority_order`.
    async fn list_active_templates(&self) -> Result<Vec<OnboardingTemplate>, StoreError>;

    // --- Reminders ---

    async fn create_reminder(
        &self,
        reminder: &NewOnboardingReminder,
    ) -> Result<OnboardingReminder, StoreError>;

    async fn find_reminder(&self, id: DbId) -> Result<Option<OnboardingReminder>, StoreError>;

    /// Pending reminders with `scheduled_for <= now`, oldest first.
    async fn list_due_reminders(&self, now: Timestamp) -> Result<Vec<OnboardingReminder>, StoreError>;

    /// Move a `pending` reminder to `sent`. Returns `false` when the reminder
    /// is missing or no longer pending; it is then left untouched.
    async fn mark_reminder_sent(&self, id: DbId, sent_at: Timestamp) -> Result<bool, StoreError>;

    /// Move a `pending` reminder to `failed`. Same contract as
    /// [`mark_reminder_sent`](Self::mark_reminder_sent).
    async fn mark_reminder_failed(&self, id: DbId, error: &str) -> Result<bool, StoreError>;

    // --- Automation audit trail ---

    async fn record_automation(
        &self,
        entry: &NewAutomationLogEntry,
    ) -> Result<AutomationLogEntry, StoreError>;

    async fn list_automation_logs(
        &self,
        user_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AutomationLogEntry>, StoreError>;
}

/// Authoritative consumption counters.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn current_usage(&self, license_id: DbId) -> Result<UsageCounts, StoreError>;
}

/// The full set of stores, cheaply cloneable.
#[derive(Clone)]
pub struct Stores {
    pub licenses: Arc<dyn LicenseStore>,
    pub onboarding: Arc<dyn OnboardingStore>,
    pub usage: Arc<dyn UsageStore>,
}
