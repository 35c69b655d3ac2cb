//! Onboarding automation: sessions, reminders and progress created when a
//! license is assigned to a user.
//!
//! Runs are sequential per event. A failure on one template is recorded and
//! the batch continues. Every invocation, including skipped ones, lands in
//! the automation log.

use std::sync::Arc;

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::license::License;
use crate::onboarding::progress::{
    apply_completion, count_completed, derive_status, onboarding_deadline_for,
    plugin_session_counts, required_sessions,
};
use crate::onboarding::{
    NewOnboardingReminder, NewOnboardingSession, OnboardingProgress, OnboardingSession,
    OnboardingTemplate, ProgressDraft, SessionStatus,
};
use crate::store::{LicenseStore, OnboardingStore};
use crate::types::{DbId, Timestamp};

/// Sessions are scheduled at this hour (UTC).
pub const SESSION_START_HOUR: u32 = 10;

/// Days between consecutive sessions.
pub const SESSION_SPACING_DAYS: i64 = 7;

/// Lead time of the `session_upcoming` reminder.
pub const REMINDER_LEAD_HOURS: i64 = 24;

pub const REMINDER_SESSION_UPCOMING: &str = "session_upcoming";

pub const SKIP_ALREADY_COMPLETED: &str = "user_already_completed_onboarding";
pub const SKIP_PROGRESS_EXISTS: &str = "onboarding_already_scheduled";

define_str_enum! {
    /// What caused an automation run.
    TriggerType {
        LicenseAssigned = "license_assigned",
        Manual = "manual",
        Backfill = "backfill",
    }
}

/// A "license assigned" event.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentEvent {
    pub user_id: String,
    pub license_key_id: DbId,
    pub trigger_type: TriggerType,
    pub triggered_by: Option<String>,
    #[serde(default)]
    pub force: bool,
}

/// A template that could not be turned into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateFailure {
    pub template_id: DbId,
    pub error: String,
}

/// Outcome of one automation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutomationReport {
    pub message: String,
    pub sessions_created: i32,
    pub session_ids: Vec<DbId>,
    pub templates_used: Vec<DbId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<TemplateFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<OnboardingProgress>,
}

impl AutomationReport {
    fn skipped(reason: &str) -> Self {
        Self {
            message: "Onboarding automation skipped".to_string(),
            sessions_created: 0,
            session_ids: Vec::new(),
            templates_used: Vec::new(),
            errors: Vec::new(),
            skipped_reason: Some(reason.to_string()),
            progress: None,
        }
    }
}

/// A persisted automation audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutomationLogEntry {
    pub id: DbId,
    pub user_id: String,
    pub license_id: DbId,
    pub trigger_type: TriggerType,
    pub triggered_by: Option<String>,
    pub sessions_created: i32,
    pub templates_used: Vec<DbId>,
    pub errors: Vec<String>,
    pub skipped_reason: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAutomationLogEntry {
    pub user_id: String,
    pub license_id: DbId,
    pub trigger_type: TriggerType,
    pub triggered_by: Option<String>,
    pub sessions_created: i32,
    pub templates_used: Vec<DbId>,
    pub errors: Vec<String>,
    pub skipped_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Templates that apply to `license`, in priority order.
pub fn select_templates<'a>(
    templates: &'a [OnboardingTemplate],
    license: &License,
) -> Vec<&'a OnboardingTemplate> {
    let mut selected: Vec<_> = templates
        .iter()
        .filter(|t| {
            t.is_active
                && t.auto_create_on_license
                && license.enabled_plugins.contains(&t.plugin_id)
                && t.license_types.contains(&license.license_type)
        })
        .collect();
    selected.sort_by_key(|t| (t.priority_order, t.id));
    selected
}

/// Scheduled start of the session at zero-based `index`.
pub fn session_schedule(index: usize, now: Timestamp) -> Timestamp {
    let start = NaiveTime::from_hms_opt(SESSION_START_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
    let day = now.date_naive().and_time(start).and_utc();
    let offset = i64::try_from(index).unwrap_or(i64::MAX / SESSION_SPACING_DAYS);
    day + Duration::days(offset * SESSION_SPACING_DAYS)
}

/// When the reminder for a session starting at `scheduled_at` fires.
pub fn reminder_time(scheduled_at: Timestamp, now: Timestamp) -> Timestamp {
    let lead = scheduled_at - Duration::hours(REMINDER_LEAD_HOURS);
    if lead <= now {
        now
    } else {
        lead
    }
}

fn new_session(
    template: &OnboardingTemplate,
    user_id: &str,
    license_id: DbId,
    session_number: i32,
    scheduled_at: Timestamp,
) -> NewOnboardingSession {
    NewOnboardingSession {
        user_id: user_id.to_string(),
        license_id,
        template_id: Some(template.id),
        plugin_id: template.plugin_id.clone(),
        session_type: template.session_type.clone(),
        session_number,
        title: template.title.clone(),
        description: template.description.clone(),
        status: SessionStatus::Scheduled,
        scheduled_at: Some(scheduled_at),
    }
}

fn upcoming_reminder(session: &OnboardingSession, scheduled_at: Timestamp, now: Timestamp) -> NewOnboardingReminder {
    NewOnboardingReminder {
        user_id: session.user_id.clone(),
        license_id: session.license_id,
        session_id: Some(session.id),
        reminder_type: REMINDER_SESSION_UPCOMING.to_string(),
        message: format!(
            "Upcoming onboarding session \"{}\" on {}",
            session.title,
            scheduled_at.format("%Y-%m-%d %H:%M UTC")
        ),
        scheduled_for: reminder_time(scheduled_at, now),
    }
}

fn log_entry(event: &AssignmentEvent, report: &AutomationReport) -> NewAutomationLogEntry {
    NewAutomationLogEntry {
        user_id: event.user_id.clone(),
        license_id: event.license_key_id,
        trigger_type: event.trigger_type,
        triggered_by: event.triggered_by.clone(),
        sessions_created: report.sessions_created,
        templates_used: report.templates_used.clone(),
        errors: report
            .errors
            .iter()
            .map(|f| format!("template {}: {}", f.template_id, f.error))
            .collect(),
        skipped_reason: report.skipped_reason.clone(),
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Creates onboarding plans and applies session completions.
pub struct OnboardingAutomation {
    licenses: Arc<dyn LicenseStore>,
    onboarding: Arc<dyn OnboardingStore>,
}

impl OnboardingAutomation {
    pub fn new(licenses: Arc<dyn LicenseStore>, onboarding: Arc<dyn OnboardingStore>) -> Self {
        Self { licenses, onboarding }
    }

    /// Handle a license assignment.
    pub async fn handle_assignment(
        &self,
        event: &AssignmentEvent,
        now: Timestamp,
    ) -> Result<AutomationReport, CoreError> {
        let license = self
            .licenses
            .find_by_id(event.license_key_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "license",
                id: event.license_key_id,
            })?;

        let existing = self.onboarding.find_progress(&event.user_id, license.id).await?;

        let skip = if self.onboarding.has_completed_onboarding(&event.user_id).await? {
            Some(SKIP_ALREADY_COMPLETED)
        } else if existing.is_some() && !event.force {
            Some(SKIP_PROGRESS_EXISTS)
        } else {
            None
        };

        if let Some(reason) = skip {
            tracing::info!(
                user_id = %event.user_id,
                license_id = license.id,
                reason,
                "Onboarding automation skipped"
            );
            let report = AutomationReport::skipped(reason);
            self.record(event, &report).await?;
            return Ok(report);
        }

        let templates = self.onboarding.list_active_templates().await?;
        let selected = select_templates(&templates, &license);

        // Numbering continues after sessions already on record.
        let existing_sessions = self.onboarding.list_sessions(&event.user_id, license.id).await?;
        let base_number = existing_sessions
            .iter()
            .map(|s| s.session_number)
            .max()
            .unwrap_or(0);

        let mut session_ids = Vec::new();
        let mut templates_used = Vec::new();
        let mut errors = Vec::new();

        for (index, template) in selected.iter().enumerate() {
            let number = base_number + i32::try_from(index + 1).unwrap_or(i32::MAX);
            let scheduled_at = session_schedule(index, now);
            let draft = new_session(template, &event.user_id, license.id, number, scheduled_at);

            let created = match self.onboarding.create_session(&draft).await {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(template_id = template.id, error = %e, "Failed to create onboarding session");
                    errors.push(TemplateFailure {
                        template_id: template.id,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            session_ids.push(created.id);
            templates_used.push(template.id);

            let reminder = upcoming_reminder(&created, scheduled_at, now);
            if let Err(e) = self.onboarding.create_reminder(&reminder).await {
                tracing::warn!(session_id = created.id, error = %e, "Failed to create session reminder");
                errors.push(TemplateFailure {
                    template_id: template.id,
                    error: format!("reminder: {e}"),
                });
            }
        }

        let sessions_created = i32::try_from(session_ids.len()).unwrap_or(i32::MAX);

        let progress = match self
            .upsert_progress(&event.user_id, &license, &selected, existing, now)
            .await
        {
            Ok(progress) => progress,
            Err(e) => {
                // Sessions already exist; the run is still audited.
                tracing::error!(
                    user_id = %event.user_id,
                    license_id = license.id,
                    sessions_created,
                    error = %e,
                    "Failed to write onboarding progress"
                );
                let report = AutomationReport {
                    message: "Onboarding progress could not be saved".to_string(),
                    sessions_created,
                    session_ids,
                    templates_used,
                    errors,
                    skipped_reason: None,
                    progress: None,
                };
                let mut entry = log_entry(event, &report);
                entry.errors.push(format!("progress: {e}"));
                if let Err(log_err) = self.onboarding.record_automation(&entry).await {
                    tracing::error!(error = %log_err, "Failed to record automation run");
                }
                return Err(e);
            }
        };

        tracing::info!(
            user_id = %event.user_id,
            license_id = license.id,
            sessions_created,
            failures = errors.len(),
            "Onboarding automation completed"
        );

        let report = AutomationReport {
            message: format!("Created {sessions_created} onboarding sessions"),
            sessions_created,
            session_ids,
            templates_used,
            errors,
            skipped_reason: None,
            progress: Some(progress),
        };
        self.record(event, &report).await?;
        Ok(report)
    }

    /// Insert or refresh the progress row for (user, license).
    ///
    /// Check-then-act: a concurrent run for the same pair may race the
    /// insert, in which case the unique constraint rejects the loser.
    async fn upsert_progress(
        &self,
        user_id: &str,
        license: &License,
        selected: &[&OnboardingTemplate],
        existing: Option<OnboardingProgress>,
        now: Timestamp,
    ) -> Result<OnboardingProgress, CoreError> {
        let mandatory = selected.iter().filter(|t| t.is_mandatory).count();
        let total_required = required_sessions(mandatory);
        let sessions = self.onboarding.list_sessions(user_id, license.id).await?;
        let completed = count_completed(&sessions);
        let deadline = onboarding_deadline_for(license);

        let draft = ProgressDraft {
            user_id: user_id.to_string(),
            license_id: license.id,
            total_sessions_required: total_required,
            plugin_sessions_required: plugin_session_counts(selected),
            sessions_completed: completed,
            overall_status: derive_status(
                existing.as_ref().map(|p| p.overall_status),
                completed,
                total_required,
                deadline,
                now,
            ),
            onboarding_deadline: deadline,
            license_active_status: existing.as_ref().map_or(true, |p| p.license_active_status),
            started_at: existing.as_ref().map_or(now, |p| p.started_at),
            completed_at: existing.as_ref().and_then(|p| p.completed_at),
        };

        let progress = match existing {
            Some(p) => self.onboarding.update_progress(p.id, &draft).await?,
            None => self.onboarding.insert_progress(&draft).await?,
        };
        Ok(progress)
    }

    async fn record(&self, event: &AssignmentEvent, report: &AutomationReport) -> Result<(), CoreError> {
        self.onboarding.record_automation(&log_entry(event, report)).await?;
        Ok(())
    }

    /// Mark a session completed and advance the owning progress row.
    ///
    /// Completing an already-completed session does not touch the session but
    /// still reconciles progress with the sessions on record, so a retry after
    /// a failed progress write converges.
    pub async fn complete_session(
        &self,
        session_id: DbId,
        now: Timestamp,
    ) -> Result<OnboardingProgress, CoreError> {
        let session = self
            .onboarding
            .find_session(session_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "onboarding_session",
                id: session_id,
            })?;

        let progress = self
            .onboarding
            .find_progress(&session.user_id, session.license_id)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "No onboarding progress for session {session_id}"
                ))
            })?;

        if session.status != SessionStatus::Completed {
            if !session.status.is_completable() {
                return Err(CoreError::Conflict(format!(
                    "Session {session_id} is {} and cannot be completed",
                    session.status
                )));
            }
            self.onboarding
                .complete_session(session_id, now)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "onboarding_session",
                    id: session_id,
                })?;
        }

        let sessions = self
            .onboarding
            .list_sessions(&session.user_id, session.license_id)
            .await?;
        let draft = apply_completion(&progress, count_completed(&sessions), now);
        let updated = self.onboarding.update_progress(progress.id, &draft).await?;

        tracing::info!(
            session_id,
            user_id = %updated.user_id,
            sessions_completed = updated.sessions_completed,
            status = %updated.overall_status,
            "Onboarding session completed"
        );
        Ok(updated)
    }
}
