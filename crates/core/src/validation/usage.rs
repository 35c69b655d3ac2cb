//! Usage quota checker.
//!
//! Compares authoritative consumption counters from the [`UsageStore`]
//! against the license ceilings. Counter failures fail closed.

use serde::{Deserialize, Serialize};

use crate::license::License;
use crate::store::UsageStore;

use super::{Denial, DenialReason};

/// Bytes per gigabyte used when converting stored object sizes.
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Current consumption within a license scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageCounts {
    pub users_count: i64,
    pub projects_count: i64,
    pub storage_used_gb: f64,
}

/// Quota ceilings taken from the license. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageLimits {
    pub max_users: Option<i64>,
    pub max_projects: Option<i64>,
    pub max_storage_gb: Option<f64>,
}

impl UsageLimits {
    pub fn from_license(license: &License) -> Self {
        Self {
            max_users: license.max_users,
            max_projects: license.max_projects,
            max_storage_gb: license.max_storage_gb,
        }
    }
}

/// Compare counts against ceilings: users, then projects, then storage.
/// The first count at or above its ceiling wins.
pub fn check_quota(current: UsageCounts, limits: UsageLimits) -> Result<(), Denial> {
    let violation = if limits.max_users.is_some_and(|max| current.users_count >= max) {
        Some((DenialReason::UserLimitExceeded, "User limit reached for this license"))
    } else if limits
        .max_projects
        .is_some_and(|max| current.projects_count >= max)
    {
        Some((DenialReason::ProjectLimitExceeded, "Project limit reached for this license"))
    } else if limits
        .max_storage_gb
        .is_some_and(|max| current.storage_used_gb >= max)
    {
        Some((DenialReason::StorageLimitExceeded, "Storage limit reached for this license"))
    } else {
        None
    };

    match violation {
        Some((reason, message)) => Err(Denial::new(reason, message).with_usage(current, limits)),
        None => Ok(()),
    }
}

/// Load current usage for `license` and check it against its ceilings.
pub async fn check_usage(store: &dyn UsageStore, license: &License) -> Result<UsageCounts, Denial> {
    let current = store.current_usage(license.id).await.map_err(|e| {
        tracing::error!(license_id = license.id, error = %e, "Usage counter lookup failed");
        Denial::new(
            DenialReason::UsageCheckFailed,
            "Unable to verify usage for this license",
        )
    })?;

    check_quota(current, UsageLimits::from_license(license))?;
    Ok(current)
}
