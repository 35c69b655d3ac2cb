//! Onboarding progress model -- pure functions over pre-loaded records.

use std::collections::BTreeMap;

use crate::license::License;
use crate::types::Timestamp;

use super::{OnboardingProgress, OnboardingSession, OnboardingTemplate, ProgressDraft, ProgressStatus, SessionStatus};

/// Floor on the number of sessions a trial license requires.
pub const MIN_SESSIONS_REQUIRED: i32 = 3;

/// The onboarding deadline falls this many days before license expiry.
pub const DEADLINE_LEAD_DAYS: i64 = 7;

/// `max(mandatory_count, MIN_SESSIONS_REQUIRED)`.
pub fn required_sessions(mandatory_count: usize) -> i32 {
    i32::try_from(mandatory_count)
        .unwrap_or(i32::MAX)
        .max(MIN_SESSIONS_REQUIRED)
}

/// Number of selected templates per plugin.
pub fn plugin_session_counts(templates: &[&OnboardingTemplate]) -> BTreeMap<String, i32> {
    let mut counts = BTreeMap::new();
    for template in templates {
        *counts.entry(template.plugin_id.clone()).or_insert(0) += 1;
    }
    counts
}

pub fn count_completed(sessions: &[OnboardingSession]) -> i32 {
    let completed = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Completed)
        .count();
    i32::try_from(completed).unwrap_or(i32::MAX)
}

/// Deadline for completing onboarding on `license`.
///
/// `expires_at - 7 days` when the license has an explicit expiry, otherwise
/// the derived trial end minus the same lead.
pub fn onboarding_deadline_for(license: &License) -> Option<Timestamp> {
    license
        .expires_at
        .or_else(|| license.trial_ends_at())
        .map(|end| end - chrono::Duration::days(DEADLINE_LEAD_DAYS))
}

/// Derive the overall status. `suspended` is sticky: only an administrator
/// lifts a suspension.
pub fn derive_status(
    current: Option<ProgressStatus>,
    sessions_completed: i32,
    total_required: i32,
    deadline: Option<Timestamp>,
    now: Timestamp,
) -> ProgressStatus {
    if current == Some(ProgressStatus::Suspended) {
        return ProgressStatus::Suspended;
    }
    if sessions_completed >= total_required {
        return ProgressStatus::Completed;
    }
    if deadline.is_some_and(|d| now > d) {
        return ProgressStatus::Overdue;
    }
    if sessions_completed > 0 {
        ProgressStatus::InProgress
    } else {
        ProgressStatus::Pending
    }
}

/// Apply a session-completion event to `progress`.
///
/// `recounted` is the number of completed sessions now on record. The stored
/// count never decreases, even if sessions were cancelled in the meantime.
pub fn apply_completion(progress: &OnboardingProgress, recounted: i32, now: Timestamp) -> ProgressDraft {
    let mut draft = ProgressDraft::from(progress);
    draft.sessions_completed = progress.sessions_completed.max(recounted);
    draft.overall_status = derive_status(
        Some(progress.overall_status),
        draft.sessions_completed,
        progress.total_sessions_required,
        progress.onboarding_deadline,
        now,
    );
    if draft.overall_status == ProgressStatus::Completed && draft.completed_at.is_none() {
        draft.completed_at = Some(now);
    }
    draft
}

pub fn is_past_deadline(progress: &OnboardingProgress, now: Timestamp) -> bool {
    progress.overall_status != ProgressStatus::Completed
        && progress.onboarding_deadline.is_some_and(|d| now > d)
}

pub fn remaining_sessions(progress: &OnboardingProgress) -> i32 {
    (progress.total_sessions_required - progress.sessions_completed).max(0)
}

fn sessions_phrase(count: i32) -> String {
    if count == 1 {
        "1 session remains".to_string()
    } else {
        format!("{count} sessions remain")
    }
}

/// Non-fatal progress warnings for a progress row that is not blocking.
pub fn progress_warnings(progress: &OnboardingProgress, now: Timestamp) -> Vec<String> {
    if progress.overall_status == ProgressStatus::Completed {
        return Vec::new();
    }
    let remaining = remaining_sessions(progress);
    if remaining == 0 {
        return Vec::new();
    }
    let warning = match progress.onboarding_deadline {
        Some(deadline) => {
            let days = (deadline - now).num_days().max(0);
            let unit = if days == 1 { "day" } else { "days" };
            format!("{}, due in {days} {unit}", sessions_phrase(remaining))
        }
        None => sessions_phrase(remaining),
    };
    vec![warning]
}

/// Guidance returned to the client when onboarding blocks a trial.
pub fn next_steps(progress: &OnboardingProgress) -> Vec<String> {
    let remaining = remaining_sessions(progress);
    let mut steps = Vec::new();
    if remaining > 0 {
        steps.push(format!(
            "Complete the remaining {remaining} onboarding session{}",
            if remaining == 1 { "" } else { "s" }
        ));
    }
    if progress.overall_status == ProgressStatus::Suspended || !progress.license_active_status {
        steps.push("Contact your account administrator to reactivate the license".to_string());
    } else {
        steps.push("Contact support to reschedule the onboarding deadline".to_string());
    }
    steps
}
