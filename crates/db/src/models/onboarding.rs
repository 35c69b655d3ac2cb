//! Onboarding row models: progress, sessions, reminders and templates.

use std::collections::BTreeMap;

use sqlx::FromRow;

use lyc_core::error::StoreError;
use lyc_core::license::LicenseType;
use lyc_core::onboarding::{
    OnboardingProgress, OnboardingReminder, OnboardingSession, OnboardingTemplate,
    ProgressStatus, ReminderStatus, SessionStatus,
};
use lyc_core::types::{DbId, Timestamp};

use super::parse_column;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// A row from the `onboarding_progress` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProgressRow {
    pub id: DbId,
    pub user_id: String,
    pub license_id: DbId,
    pub total_sessions_required: i32,
    pub plugin_sessions_required: serde_json::Value,
    pub sessions_completed: i32,
    pub overall_status: String,
    pub onboarding_deadline: Option<Timestamp>,
    pub license_active_status: bool,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ProgressRow> for OnboardingProgress {
    type Error = StoreError;

    fn try_from(row: ProgressRow) -> Result<Self, Self::Error> {
        let plugin_sessions_required: BTreeMap<String, i32> =
            serde_json::from_value(row.plugin_sessions_required).map_err(|e| {
                StoreError::Malformed(format!("plugin_sessions_required for progress {}: {e}", row.id))
            })?;

        Ok(OnboardingProgress {
            id: row.id,
            user_id: row.user_id,
            license_id: row.license_id,
            total_sessions_required: row.total_sessions_required,
            plugin_sessions_required,
            sessions_completed: row.sessions_completed,
            overall_status: parse_column(
                "overall_status",
                &row.overall_status,
                ProgressStatus::from_str_value,
            )?,
            onboarding_deadline: row.onboarding_deadline,
            license_active_status: row.license_active_status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// A row from the `onboarding_sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: DbId,
    pub user_id: String,
    pub license_id: DbId,
    pub template_id: Option<DbId>,
    pub plugin_id: String,
    pub session_type: String,
    pub session_number: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub scheduled_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl TryFrom<SessionRow> for OnboardingSession {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(OnboardingSession {
            id: row.id,
            user_id: row.user_id,
            license_id: row.license_id,
            template_id: row.template_id,
            plugin_id: row.plugin_id,
            session_type: row.session_type,
            session_number: row.session_number,
            title: row.title,
            description: row.description,
            status: parse_column("status", &row.status, SessionStatus::from_str_value)?,
            scheduled_at: row.scheduled_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

/// A row from the `onboarding_reminders` table.
#[derive(Debug, Clone, FromRow)]
pub struct ReminderRow {
    pub id: DbId,
    pub user_id: String,
    pub license_id: DbId,
    pub session_id: Option<DbId>,
    pub reminder_type: String,
    pub message: String,
    pub scheduled_for: Timestamp,
    pub status: String,
    pub sent_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
}

impl TryFrom<ReminderRow> for OnboardingReminder {
    type Error = StoreError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        Ok(OnboardingReminder {
            id: row.id,
            user_id: row.user_id,
            license_id: row.license_id,
            session_id: row.session_id,
            reminder_type: row.reminder_type,
            message: row.message,
            scheduled_for: row.scheduled_for,
            status: parse_column("status", &row.status, ReminderStatus::from_str_value)?,
            sent_at: row.sent_at,
            last_error: row.last_error,
            created_at: row.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// A row from the `onboarding_templates` table.
#[derive(Debug, Clone, FromRow)]
pub struct TemplateRow {
    pub id: DbId,
    pub plugin_id: String,
    pub session_type: String,
    pub title: String,
    pub description: Option<String>,
    pub license_types: Vec<String>,
    pub auto_create_on_license: bool,
    pub is_mandatory: bool,
    pub priority_order: i32,
    pub duration_minutes: i32,
    pub is_active: bool,
}

impl TryFrom<TemplateRow> for OnboardingTemplate {
    type Error = StoreError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        let license_types = row
            .license_types
            .iter()
            .map(|t| parse_column("license_types", t, LicenseType::from_str_value))
            .collect::<Result<_, _>>()?;

        Ok(OnboardingTemplate {
            id: row.id,
            plugin_id: row.plugin_id,
            session_type: row.session_type,
            title: row.title,
            description: row.description,
            license_types,
            auto_create_on_license: row.auto_create_on_license,
            is_mandatory: row.is_mandatory,
            priority_order: row.priority_order,
            duration_minutes: row.duration_minutes,
            is_active: row.is_active,
        })
    }
}
