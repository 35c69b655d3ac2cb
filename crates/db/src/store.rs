//! Postgres implementations of the `lyc-core` store traits.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use lyc_core::automation::{AutomationLogEntry, NewAutomationLogEntry};
use lyc_core::error::StoreError;
use lyc_core::license::{DerivedLicenseFields, License};
use lyc_core::onboarding::{
    NewOnboardingReminder, NewOnboardingSession, OnboardingProgress, OnboardingReminder,
    OnboardingSession, OnboardingTemplate, ProgressDraft,
};
use lyc_core::store::{LicenseStore, OnboardingStore, Stores, UsageStore};
use lyc_core::types::{DbId, Timestamp};
use lyc_core::validation::usage::{UsageCounts, BYTES_PER_GB};

use crate::repositories::{
    AutomationLogRepo, LicenseRepo, OnboardingProgressRepo, OnboardingReminderRepo,
    OnboardingSessionRepo, OnboardingTemplateRepo, UsageRepo,
};

fn db_error(err: sqlx::Error) -> StoreError {
    tracing::debug!(error = %err, "Database query failed");
    StoreError::Unavailable(err.to_string())
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn convert_opt<R, T>(row: Option<R>) -> Result<Option<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    row.map(T::try_from).transpose()
}

/// Build the full store set over one pool.
pub fn pg_stores(pool: PgPool) -> Stores {
    Stores {
        licenses: Arc::new(PgLicenseStore::new(pool.clone())),
        onboarding: Arc::new(PgOnboardingStore::new(pool.clone())),
        usage: Arc::new(PgUsageStore::new(pool)),
    }
}

// ---------------------------------------------------------------------------
// Licenses
// ---------------------------------------------------------------------------

pub struct PgLicenseStore {
    pool: PgPool,
}

impl PgLicenseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LicenseStore for PgLicenseStore {
    async fn find_by_key(&self, license_key: &str) -> Result<Option<License>, StoreError> {
        let row = LicenseRepo::find_by_key(&self.pool, license_key)
            .await
            .map_err(db_error)?;
        convert_opt(row)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<License>, StoreError> {
        let row = LicenseRepo::find_by_id(&self.pool, id).await.map_err(db_error)?;
        convert_opt(row)
    }

    async fn update_derived_fields(
        &self,
        id: DbId,
        fields: &DerivedLicenseFields,
    ) -> Result<Option<License>, StoreError> {
        let row = LicenseRepo::update_derived_fields(&self.pool, id, fields)
            .await
            .map_err(db_error)?;
        convert_opt(row)
    }
}

// ---------------------------------------------------------------------------
// Onboarding
// ---------------------------------------------------------------------------

pub struct PgOnboardingStore {
    pool: PgPool,
}

impl PgOnboardingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OnboardingStore for PgOnboardingStore {
    async fn find_progress(
        &self,
        user_id: &str,
        license_id: DbId,
    ) -> Result<Option<OnboardingProgress>, StoreError> {
        let row = OnboardingProgressRepo::find(&self.pool, user_id, license_id)
            .await
            .map_err(db_error)?;
        convert_opt(row)
    }

    async fn has_completed_onboarding(&self, user_id: &str) -> Result<bool, StoreError> {
        OnboardingProgressRepo::has_completed(&self.pool, user_id)
            .await
            .map_err(db_error)
    }

    async fn insert_progress(&self, draft: &ProgressDraft) -> Result<OnboardingProgress, StoreError> {
        let row = OnboardingProgressRepo::insert(&self.pool, draft)
            .await
            .map_err(db_error)?;
        OnboardingProgress::try_from(row)
    }

    async fn update_progress(
        &self,
        id: DbId,
        draft: &ProgressDraft,
    ) -> Result<OnboardingProgress, StoreError> {
        let row = OnboardingProgressRepo::update(&self.pool, id, draft)
            .await
            .map_err(db_error)?;
        OnboardingProgress::try_from(row)
    }

    async fn list_sessions(
        &self,
        user_id: &str,
        license_id: DbId,
    ) -> Result<Vec<OnboardingSession>, StoreError> {
        let rows = OnboardingSessionRepo::list_for_user_license(&self.pool, user_id, license_id)
            .await
            .map_err(db_error)?;
        convert_all(rows)
    }

    async fn find_session(&self, id: DbId) -> Result<Option<OnboardingSession>, StoreError> {
        let row = OnboardingSessionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(db_error)?;
        convert_opt(row)
    }

    async fn create_session(
        &self,
        session: &NewOnboardingSession,
    ) -> Result<OnboardingSession, StoreError> {
        let row = OnboardingSessionRepo::create(&self.pool, session)
            .await
            .map_err(db_error)?;
        OnboardingSession::try_from(row)
    }

    async fn complete_session(
        &self,
        id: DbId,
        completed_at: Timestamp,
    ) -> Result<Option<OnboardingSession>, StoreError> {
        let row = OnboardingSessionRepo::mark_completed(&self.pool, id, completed_at)
            .await
            .map_err(db_error)?;
        convert_opt(row)
    }

    async fn list_active_templates(&self) -> Result<Vec<OnboardingTemplate>, StoreError> {
        let rows = OnboardingTemplateRepo::list_active(&self.pool)
            .await
            .map_err(db_error)?;
        convert_all(rows)
    }

    async fn create_reminder(
        &self,
        reminder: &NewOnboardingReminder,
    ) -> Result<OnboardingReminder, StoreError> {
        let row = OnboardingReminderRepo::create(&self.pool, reminder)
            .await
            .map_err(db_error)?;
        OnboardingReminder::try_from(row)
    }

    async fn find_reminder(&self, id: DbId) -> Result<Option<OnboardingReminder>, StoreError> {
        let row = OnboardingReminderRepo::find_by_id(&self.pool, id)
            .await
            .map_err(db_error)?;
        convert_opt(row)
    }

    async fn list_due_reminders(&self, now: Timestamp) -> Result<Vec<OnboardingReminder>, StoreError> {
        let rows = OnboardingReminderRepo::list_due(&self.pool, now)
            .await
            .map_err(db_error)?;
        convert_all(rows)
    }

    async fn mark_reminder_sent(&self, id: DbId, sent_at: Timestamp) -> Result<bool, StoreError> {
        OnboardingReminderRepo::mark_sent(&self.pool, id, sent_at)
            .await
            .map_err(db_error)
    }

    async fn mark_reminder_failed(&self, id: DbId, error: &str) -> Result<bool, StoreError> {
        OnboardingReminderRepo::mark_failed(&self.pool, id, error)
            .await
            .map_err(db_error)
    }

    async fn record_automation(
        &self,
        entry: &NewAutomationLogEntry,
    ) -> Result<AutomationLogEntry, StoreError> {
        let row = AutomationLogRepo::create(&self.pool, entry)
            .await
            .map_err(db_error)?;
        AutomationLogEntry::try_from(row)
    }

    async fn list_automation_logs(
        &self,
        user_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AutomationLogEntry>, StoreError> {
        let rows = AutomationLogRepo::list(&self.pool, user_id, limit, offset)
            .await
            .map_err(db_error)?;
        convert_all(rows)
    }
}

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

pub struct PgUsageStore {
    pool: PgPool,
}

impl PgUsageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageStore for PgUsageStore {
    async fn current_usage(&self, license_id: DbId) -> Result<UsageCounts, StoreError> {
        let row = UsageRepo::current_usage(&self.pool, license_id)
            .await
            .map_err(db_error)?;
        Ok(UsageCounts {
            users_count: row.users_count,
            projects_count: row.projects_count,
            storage_used_gb: row.storage_used_bytes as f64 / BYTES_PER_GB,
        })
    }
}
