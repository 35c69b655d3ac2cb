//! In-memory store implementations for tests and local development.
//!
//! Each store can be switched into an unavailable state to exercise the
//! failure paths of the engine.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::automation::{AutomationLogEntry, NewAutomationLogEntry};
use crate::error::StoreError;
use crate::license::{DerivedLicenseFields, License};
use crate::onboarding::{
    NewOnboardingReminder, NewOnboardingSession, OnboardingProgress, OnboardingReminder,
    OnboardingSession, OnboardingTemplate, ProgressDraft, ProgressStatus, ReminderStatus,
    SessionStatus,
};
use crate::reminders::{NotifyError, ReminderNotifier};
use crate::store::{LicenseStore, OnboardingStore, UsageStore};
use crate::types::{DbId, Timestamp};
use crate::validation::usage::UsageCounts;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("in-memory store switched off".to_string())
}

// ---------------------------------------------------------------------------
// Licenses
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryLicenseStore {
    licenses: Mutex<BTreeMap<DbId, License>>,
    unavailable: Mutex<bool>,
}

impl InMemoryLicenseStore {
    /// Insert or replace a license, keyed by its id.
    pub fn insert(&self, license: License) {
        lock(&self.licenses).insert(license.id, license);
    }

    pub fn set_unavailable(&self, value: bool) {
        *lock(&self.unavailable) = value;
    }

    fn check(&self) -> Result<(), StoreError> {
        if *lock(&self.unavailable) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LicenseStore for InMemoryLicenseStore {
    async fn find_by_key(&self, license_key: &str) -> Result<Option<License>, StoreError> {
        self.check()?;
        Ok(lock(&self.licenses)
            .values()
            .find(|l| l.license_key == license_key)
            .cloned())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<License>, StoreError> {
        self.check()?;
        Ok(lock(&self.licenses).get(&id).cloned())
    }

    async fn update_derived_fields(
        &self,
        id: DbId,
        fields: &DerivedLicenseFields,
    ) -> Result<Option<License>, StoreError> {
        self.check()?;
        let mut licenses = lock(&self.licenses);
        let Some(license) = licenses.get_mut(&id) else {
            return Ok(None);
        };
        license.enabled_plugins = fields.enabled_plugins.clone();
        license.access_level = fields.access_level;
        license.time_limit_type = fields.time_limit_type;
        license.custom_trial_days = fields.custom_trial_days;
        license.updated_at = Utc::now();
        Ok(Some(license.clone()))
    }
}

// ---------------------------------------------------------------------------
// Onboarding
// ---------------------------------------------------------------------------

#[derive(Default)]
struct OnboardingTables {
    next_id: DbId,
    progress: BTreeMap<DbId, OnboardingProgress>,
    sessions: BTreeMap<DbId, OnboardingSession>,
    templates: BTreeMap<DbId, OnboardingTemplate>,
    reminders: BTreeMap<DbId, OnboardingReminder>,
    logs: Vec<AutomationLogEntry>,
}

impl OnboardingTables {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct InMemoryOnboardingStore {
    tables: Mutex<OnboardingTables>,
    unavailable: Mutex<bool>,
    latency: Mutex<Option<Duration>>,
    failing_plugins: Mutex<BTreeSet<String>>,
    failing_progress_updates: Mutex<usize>,
    malformed_progress: Mutex<bool>,
}

impl InMemoryOnboardingStore {
    pub fn insert_template(&self, template: OnboardingTemplate) {
        lock(&self.tables).templates.insert(template.id, template);
    }

    pub fn set_unavailable(&self, value: bool) {
        *lock(&self.unavailable) = value;
    }

    /// Delay applied to every progress lookup.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *lock(&self.latency) = latency;
    }

    /// Make session inserts for `plugin_id` fail.
    pub fn fail_sessions_for_plugin(&self, plugin_id: &str) {
        lock(&self.failing_plugins).insert(plugin_id.to_string());
    }

    /// Make progress lookups report an unreadable row.
    pub fn set_progress_malformed(&self, value: bool) {
        *lock(&self.malformed_progress) = value;
    }

    /// Make the next `count` progress updates fail without writing.
    pub fn fail_next_progress_updates(&self, count: usize) {
        *lock(&self.failing_progress_updates) = count;
    }

    fn check(&self) -> Result<(), StoreError> {
        if *lock(&self.unavailable) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }

    /// Applies `apply` to a pending reminder; returns whether it was pending.
    fn with_pending_reminder(
        &self,
        id: DbId,
        apply: impl FnOnce(&mut OnboardingReminder),
    ) -> Result<bool, StoreError> {
        self.check()?;
        let mut tables = lock(&self.tables);
        match tables.reminders.get_mut(&id) {
            Some(reminder) if reminder.status == ReminderStatus::Pending => {
                apply(reminder);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl OnboardingStore for InMemoryOnboardingStore {
    async fn find_progress(
        &self,
        user_id: &str,
        license_id: DbId,
    ) -> Result<Option<OnboardingProgress>, StoreError> {
        let latency = *lock(&self.latency);
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        if *lock(&self.malformed_progress) {
            return Err(StoreError::Malformed(format!(
                "progress for {user_id}/{license_id}: unknown overall_status"
            )));
        }
        Ok(lock(&self.tables)
            .progress
            .values()
            .find(|p| p.user_id == user_id && p.license_id == license_id)
            .cloned())
    }

    async fn has_completed_onboarding(&self, user_id: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(lock(&self.tables)
            .progress
            .values()
            .any(|p| p.user_id == user_id && p.overall_status == ProgressStatus::Completed))
    }

    async fn insert_progress(&self, draft: &ProgressDraft) -> Result<OnboardingProgress, StoreError> {
        self.check()?;
        let mut tables = lock(&self.tables);
        let duplicate = tables
            .progress
            .values()
            .any(|p| p.user_id == draft.user_id && p.license_id == draft.license_id);
        if duplicate {
            return Err(StoreError::Unavailable(
                "duplicate key value violates uq_onboarding_progress_user_license".to_string(),
            ));
        }
        let id = tables.allocate_id();
        let now = Utc::now();
        let progress = progress_from_draft(id, draft, now, now);
        tables.progress.insert(id, progress.clone());
        Ok(progress)
    }

    async fn update_progress(
        &self,
        id: DbId,
        draft: &ProgressDraft,
    ) -> Result<OnboardingProgress, StoreError> {
        self.check()?;
        {
            let mut failing = lock(&self.failing_progress_updates);
            if *failing > 0 {
                *failing -= 1;
                return Err(StoreError::Unavailable(format!("progress {id} update rejected")));
            }
        }
        let mut tables = lock(&self.tables);
        let created_at = tables
            .progress
            .get(&id)
            .map(|p| p.created_at)
            .ok_or_else(|| StoreError::Unavailable(format!("progress {id} vanished")))?;
        let progress = progress_from_draft(id, draft, created_at, Utc::now());
        tables.progress.insert(id, progress.clone());
        Ok(progress)
    }

    async fn list_sessions(
        &self,
        user_id: &str,
        license_id: DbId,
    ) -> Result<Vec<OnboardingSession>, StoreError> {
        self.check()?;
        let mut sessions: Vec<_> = lock(&self.tables)
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.license_id == license_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| (s.session_number, s.id));
        Ok(sessions)
    }

    async fn find_session(&self, id: DbId) -> Result<Option<OnboardingSession>, StoreError> {
        self.check()?;
        Ok(lock(&self.tables).sessions.get(&id).cloned())
    }

    async fn create_session(
        &self,
        session: &NewOnboardingSession,
    ) -> Result<OnboardingSession, StoreError> {
        self.check()?;
        if lock(&self.failing_plugins).contains(&session.plugin_id) {
            return Err(StoreError::Unavailable(format!(
                "session insert rejected for plugin {}",
                session.plugin_id
            )));
        }
        let mut tables = lock(&self.tables);
        let id = tables.allocate_id();
        let created = OnboardingSession {
            id,
            user_id: session.user_id.clone(),
            license_id: session.license_id,
            template_id: session.template_id,
            plugin_id: session.plugin_id.clone(),
            session_type: session.session_type.clone(),
            session_number: session.session_number,
            title: session.title.clone(),
            description: session.description.clone(),
            status: session.status,
            scheduled_at: session.scheduled_at,
            completed_at: None,
            created_at: Utc::now(),
        };
        tables.sessions.insert(id, created.clone());
        Ok(created)
    }

    async fn complete_session(
        &self,
        id: DbId,
        completed_at: Timestamp,
    ) -> Result<Option<OnboardingSession>, StoreError> {
        self.check()?;
        let mut tables = lock(&self.tables);
        let Some(session) = tables.sessions.get_mut(&id) else {
            return Ok(None);
        };
        session.status = SessionStatus::Completed;
        session.completed_at = Some(completed_at);
        Ok(Some(session.clone()))
    }

    async fn list_active_templates(&self) -> Result<Vec<OnboardingTemplate>, StoreError> {
        self.check()?;
        let mut templates: Vec<_> = lock(&self.tables)
            .templates
            .values()
            .filter(|t| t.is_active)
            .cloned()
            .collect();
        templates.sort_by_key(|t| (t.priority_order, t.id));
        Ok(templates)
    }

    async fn create_reminder(
        &self,
        reminder: &NewOnboardingReminder,
    ) -> Result<OnboardingReminder, StoreError> {
        self.check()?;
        let mut tables = lock(&self.tables);
        let id = tables.allocate_id();
        let created = OnboardingReminder {
            id,
            user_id: reminder.user_id.clone(),
            license_id: reminder.license_id,
            session_id: reminder.session_id,
            reminder_type: reminder.reminder_type.clone(),
            message: reminder.message.clone(),
            scheduled_for: reminder.scheduled_for,
            status: ReminderStatus::Pending,
            sent_at: None,
            last_error: None,
            created_at: Utc::now(),
        };
        tables.reminders.insert(id, created.clone());
        Ok(created)
    }

    async fn find_reminder(&self, id: DbId) -> Result<Option<OnboardingReminder>, StoreError> {
        self.check()?;
        Ok(lock(&self.tables).reminders.get(&id).cloned())
    }

    async fn list_due_reminders(&self, now: Timestamp) -> Result<Vec<OnboardingReminder>, StoreError> {
        self.check()?;
        let mut due: Vec<_> = lock(&self.tables)
            .reminders
            .values()
            .filter(|r| r.status == ReminderStatus::Pending && r.scheduled_for <= now)
            .cloned()
            .collect();
        due.sort_by_key(|r| (r.scheduled_for, r.id));
        Ok(due)
    }

    async fn mark_reminder_sent(&self, id: DbId, sent_at: Timestamp) -> Result<bool, StoreError> {
        self.with_pending_reminder(id, |r| {
            r.status = ReminderStatus::Sent;
            r.sent_at = Some(sent_at);
            r.last_error = None;
        })
    }

    async fn mark_reminder_failed(&self, id: DbId, error: &str) -> Result<bool, StoreError> {
        self.with_pending_reminder(id, |r| {
            r.status = ReminderStatus::Failed;
            r.last_error = Some(error.to_string());
        })
    }

    async fn record_automation(
        &self,
        entry: &NewAutomationLogEntry,
    ) -> Result<AutomationLogEntry, StoreError> {
        self.check()?;
        let mut tables = lock(&self.tables);
        let id = tables.allocate_id();
        let logged = AutomationLogEntry {
            id,
            user_id: entry.user_id.clone(),
            license_id: entry.license_id,
            trigger_type: entry.trigger_type,
            triggered_by: entry.triggered_by.clone(),
            sessions_created: entry.sessions_created,
            templates_used: entry.templates_used.clone(),
            errors: entry.errors.clone(),
            skipped_reason: entry.skipped_reason.clone(),
            created_at: Utc::now(),
        };
        tables.logs.push(logged.clone());
        Ok(logged)
    }

    async fn list_automation_logs(
        &self,
        user_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AutomationLogEntry>, StoreError> {
        self.check()?;
        let skip = usize::try_from(offset).unwrap_or(0);
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(lock(&self.tables)
            .logs
            .iter()
            .rev()
            .filter(|e| user_id.map_or(true, |u| e.user_id == u))
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }
}

fn progress_from_draft(
    id: DbId,
    draft: &ProgressDraft,
    created_at: Timestamp,
    updated_at: Timestamp,
) -> OnboardingProgress {
    OnboardingProgress {
        id,
        user_id: draft.user_id.clone(),
        license_id: draft.license_id,
        total_sessions_required: draft.total_sessions_required,
        plugin_sessions_required: draft.plugin_sessions_required.clone(),
        sessions_completed: draft.sessions_completed,
        overall_status: draft.overall_status,
        onboarding_deadline: draft.onboarding_deadline,
        license_active_status: draft.license_active_status,
        started_at: draft.started_at,
        completed_at: draft.completed_at,
        created_at,
        updated_at,
    }
}

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

/// Usage counters keyed by license id. Unknown licenses report zero usage.
#[derive(Default)]
pub struct InMemoryUsageStore {
    counts: Mutex<HashMap<DbId, UsageCounts>>,
    unavailable: Mutex<bool>,
}

impl InMemoryUsageStore {
    pub fn set(&self, license_id: DbId, counts: UsageCounts) {
        lock(&self.counts).insert(license_id, counts);
    }

    pub fn set_unavailable(&self, value: bool) {
        *lock(&self.unavailable) = value;
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn current_usage(&self, license_id: DbId) -> Result<UsageCounts, StoreError> {
        if *lock(&self.unavailable) {
            return Err(unavailable());
        }
        Ok(lock(&self.counts).get(&license_id).copied().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Notifier that records delivered reminder ids. Reminders addressed to a
/// configured user fail.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<DbId>>,
    failing_user: Option<String>,
}

impl RecordingNotifier {
    pub fn failing_for(user_id: &str) -> Self {
        Self {
            delivered: Mutex::default(),
            failing_user: Some(user_id.to_string()),
        }
    }

    pub fn delivered(&self) -> Vec<DbId> {
        lock(&self.delivered).clone()
    }
}

#[async_trait]
impl ReminderNotifier for RecordingNotifier {
    async fn notify(&self, reminder: &OnboardingReminder) -> Result<(), NotifyError> {
        if self.failing_user.as_deref() == Some(reminder.user_id.as_str()) {
            return Err(NotifyError::Rejected(format!(
                "no delivery address for {}",
                reminder.user_id
            )));
        }
        lock(&self.delivered).push(reminder.id);
        Ok(())
    }
}
