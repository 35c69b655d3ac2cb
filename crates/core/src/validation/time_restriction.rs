//! Time restriction evaluator -- pure logic, no store access.

use crate::license::License;
use crate::types::Timestamp;

use super::{Denial, DenialReason};

/// Warn when the license expires within this many days.
pub const EXPIRY_WARNING_DAYS: i64 = 7;

/// Warn when a trial ends within this many days.
pub const TRIAL_WARNING_DAYS: i64 = 3;

fn format_date(ts: Timestamp) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Evaluate expiry and trial windows for `license` at `now`.
///
/// The explicit `expires_at` check runs first and short-circuits. Trial
/// arithmetic (`trial_30`, `trial_custom`) is evaluated afterwards, so both
/// sources may contribute warnings.
pub fn evaluate_time_restrictions(license: &License, now: Timestamp) -> Result<Vec<String>, Denial> {
    let mut warnings = Vec::new();

    if let Some(expires_at) = license.expires_at {
        if now > expires_at {
            return Err(Denial::new(
                DenialReason::LicenseExpired,
                format!("License expired on {}", format_date(expires_at)),
            )
            .with_expires_at(expires_at));
        }
        if expires_at - now <= chrono::Duration::days(EXPIRY_WARNING_DAYS) {
            warnings.push(format!("License expires on {}", format_date(expires_at)));
        }
    }

    if let Some(trial_end) = license.trial_ends_at() {
        if now > trial_end {
            return Err(Denial::new(
                DenialReason::TrialExpired,
                format!("Trial period ended on {}", format_date(trial_end)),
            )
            .with_expires_at(trial_end));
        }
        if trial_end - now <= chrono::Duration::days(TRIAL_WARNING_DAYS) {
            warnings.push(format!("Trial ends on {}", format_date(trial_end)));
        }
    }

    Ok(warnings)
}
