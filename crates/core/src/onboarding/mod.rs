//! Onboarding entities: progress, sessions, reminders and templates.
//!
//! Trial licenses stay valid only while their holder keeps up with the
//! onboarding sessions the license requires. [`progress`] holds the pure
//! progress model and [`gate`] applies it during license validation.

pub mod gate;
pub mod progress;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::license::LicenseType;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

define_str_enum! {
    /// Overall onboarding status for a (user, license) pair.
    ProgressStatus {
        Pending = "pending",
        InProgress = "in_progress",
        Completed = "completed",
        Overdue = "overdue",
        Suspended = "suspended",
    }
}

define_str_enum! {
    /// Lifecycle of a single onboarding session.
    SessionStatus {
        Pending = "pending",
        Scheduled = "scheduled",
        InProgress = "in_progress",
        Completed = "completed",
        Cancelled = "cancelled",
        NoShow = "no_show",
    }
}

impl SessionStatus {
    /// Whether a session in this status may still be completed.
    pub fn is_completable(self) -> bool {
        matches!(self, Self::Pending | Self::Scheduled | Self::InProgress)
    }
}

define_str_enum! {
    /// Delivery status of a reminder.
    ReminderStatus {
        Pending = "pending",
        Sent = "sent",
        Delivered = "delivered",
        Failed = "failed",
        Cancelled = "cancelled",
    }
}

impl ReminderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed | Self::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// One row per (user, license) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingProgress {
    pub id: DbId,
    pub user_id: String,
    pub license_id: DbId,
    pub total_sessions_required: i32,
    pub plugin_sessions_required: BTreeMap<String, i32>,
    pub sessions_completed: i32,
    pub overall_status: ProgressStatus,
    pub onboarding_deadline: Option<Timestamp>,
    pub license_active_status: bool,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Every writable progress field. Used for both insert and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressDraft {
    pub user_id: String,
    pub license_id: DbId,
    pub total_sessions_required: i32,
    pub plugin_sessions_required: BTreeMap<String, i32>,
    pub sessions_completed: i32,
    pub overall_status: ProgressStatus,
    pub onboarding_deadline: Option<Timestamp>,
    pub license_active_status: bool,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl From<&OnboardingProgress> for ProgressDraft {
    fn from(p: &OnboardingProgress) -> Self {
        Self {
            user_id: p.user_id.clone(),
            license_id: p.license_id,
            total_sessions_required: p.total_sessions_required,
            plugin_sessions_required: p.plugin_sessions_required.clone(),
            sessions_completed: p.sessions_completed,
            overall_status: p.overall_status,
            onboarding_deadline: p.onboarding_deadline,
            license_active_status: p.license_active_status,
            started_at: p.started_at,
            completed_at: p.completed_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingSession {
    pub id: DbId,
    pub user_id: String,
    pub license_id: DbId,
    pub template_id: Option<DbId>,
    pub plugin_id: String,
    pub session_type: String,
    pub session_number: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: SessionStatus,
    pub scheduled_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOnboardingSession {
    pub user_id: String,
    pub license_id: DbId,
    pub template_id: Option<DbId>,
    pub plugin_id: String,
    pub session_type: String,
    pub session_number: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: SessionStatus,
    pub scheduled_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingReminder {
    pub id: DbId,
    pub user_id: String,
    pub license_id: DbId,
    pub session_id: Option<DbId>,
    pub reminder_type: String,
    pub message: String,
    pub scheduled_for: Timestamp,
    pub status: ReminderStatus,
    pub sent_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOnboardingReminder {
    pub user_id: String,
    pub license_id: DbId,
    pub session_id: Option<DbId>,
    pub reminder_type: String,
    pub message: String,
    pub scheduled_for: Timestamp,
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Blueprint for sessions created automatically on license assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingTemplate {
    pub id: DbId,
    pub plugin_id: String,
    pub session_type: String,
    pub title: String,
    pub description: Option<String>,
    pub license_types: BTreeSet<LicenseType>,
    pub auto_create_on_license: bool,
    pub is_mandatory: bool,
    pub priority_order: i32,
    pub duration_minutes: i32,
    pub is_active: bool,
}
