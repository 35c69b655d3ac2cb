//! Onboarding gate for trial licenses.
//!
//! A trial license is valid only while the principal's onboarding progress
//! is on track. The progress lookup is bounded by a timeout; when the
//! Onboarding Store cannot answer, [`GateConfig::fail_open`] decides whether
//! the request is allowed with a warning or fails closed. A progress row that
//! cannot be read always fails closed.

use std::time::Duration;

use crate::error::StoreError;
use crate::license::License;
use crate::store::OnboardingStore;
use crate::types::Timestamp;
use crate::validation::{Denial, DenialReason, OnboardingStatusSummary};

use super::progress::{is_past_deadline, next_steps, progress_warnings};
use super::{OnboardingProgress, ProgressStatus};

/// Warning attached when the gate fails open.
pub const UNVERIFIED_WARNING: &str = "Unable to verify onboarding status";

/// Default bound on the progress lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(3000);

/// Onboarding gate policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Allow (with a warning) when the Onboarding Store is unreachable.
    pub fail_open: bool,
    pub lookup_timeout: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            fail_open: true,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

fn summary(progress: &OnboardingProgress) -> OnboardingStatusSummary {
    OnboardingStatusSummary {
        overall_status: progress.overall_status,
        sessions_completed: progress.sessions_completed,
        total_sessions_required: progress.total_sessions_required,
        onboarding_deadline: progress.onboarding_deadline,
        next_steps: next_steps(progress),
    }
}

/// Apply the completion/suspension policy to a loaded progress row.
pub fn evaluate_progress(progress: &OnboardingProgress, now: Timestamp) -> Result<Vec<String>, Denial> {
    if progress.overall_status == ProgressStatus::Suspended || !progress.license_active_status {
        return Err(Denial::new(
            DenialReason::OnboardingIncomplete,
            "License suspended until onboarding is completed",
        )
        .with_onboarding_status(summary(progress)));
    }

    if progress.overall_status == ProgressStatus::Overdue || is_past_deadline(progress, now) {
        return Err(Denial::new(
            DenialReason::OnboardingIncomplete,
            "Onboarding deadline passed before all sessions were completed",
        )
        .with_onboarding_status(summary(progress)));
    }

    Ok(progress_warnings(progress, now))
}

/// Run the gate for a trial license.
///
/// Returns `Ok(Ok(warnings))` to allow, `Ok(Err(denial))` to deny and
/// `Err(_)` when the store failed and the gate is configured to fail closed,
/// or when the stored progress is malformed.
pub async fn check_onboarding(
    store: &dyn OnboardingStore,
    license: &License,
    user_id: Option<&str>,
    now: Timestamp,
    config: &GateConfig,
) -> Result<Result<Vec<String>, Denial>, StoreError> {
    let Some(user_id) = user_id else {
        return Ok(Err(Denial::new(
            DenialReason::OnboardingRequired,
            "Trial licenses require an identified user",
        )));
    };

    let lookup = tokio::time::timeout(config.lookup_timeout, store.find_progress(user_id, license.id)).await;

    let failure = match lookup {
        Ok(Ok(Some(progress))) => return Ok(evaluate_progress(&progress, now)),
        Ok(Ok(None)) => {
            return Ok(Err(Denial::new(
                DenialReason::OnboardingRequired,
                "Onboarding has not been scheduled for this license",
            )))
        }
        Ok(Err(e @ StoreError::Malformed(_))) => {
            tracing::error!(
                license_id = license.id,
                user_id,
                error = %e,
                "Onboarding progress unreadable, failing closed"
            );
            return Err(e);
        }
        Ok(Err(e)) => e,
        Err(_) => StoreError::Unavailable(format!(
            "onboarding lookup exceeded {} ms",
            config.lookup_timeout.as_millis()
        )),
    };

    if config.fail_open {
        tracing::warn!(
            license_id = license.id,
            user_id,
            error = %failure,
            "Onboarding status unavailable, failing open"
        );
        Ok(Ok(vec![UNVERIFIED_WARNING.to_string()]))
    } else {
        tracing::error!(
            license_id = license.id,
            user_id,
            error = %failure,
            "Onboarding status unavailable, failing closed"
        );
        Err(failure)
    }
}
