//! License records, the enums that describe them, and the typed plugin
//! capability schema stored in `plugin_permissions`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Length of a `trial_30` license in days.
pub const TRIAL_30_DAYS: i64 = 30;

/// Upper bound on `custom_trial_days` (ten years).
pub const MAX_CUSTOM_TRIAL_DAYS: i32 = 3650;

/// Maximum length of a plugin identifier.
pub const MAX_PLUGIN_ID_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

define_str_enum! {
    /// Commercial tier of a license.
    #[derive(PartialOrd, Ord)]
    LicenseType {
        Trial = "trial",
        Standard = "standard",
        Professional = "professional",
        Enterprise = "enterprise",
    }
}

define_str_enum! {
    /// Lifecycle status. Licenses are never deleted, only suspended or revoked.
    LicenseStatus {
        Active = "active",
        Suspended = "suspended",
        Revoked = "revoked",
    }
}

define_str_enum! {
    /// Which rule governs expiry computation.
    TimeLimitType {
        Unlimited = "unlimited",
        Trial30 = "trial_30",
        TrialCustom = "trial_custom",
        FixedPeriod = "fixed_period",
    }
}

define_str_enum! {
    /// Access level. Variants are declared in ascending order so the derived
    /// `Ord` gives `basic < standard < advanced < full`.
    #[derive(PartialOrd, Ord)]
    AccessLevel {
        Basic = "basic",
        Standard = "standard",
        Advanced = "advanced",
        Full = "full",
    }
}

impl AccessLevel {
    /// Access level implied by a license tier, used to backfill licenses that
    /// carry no explicit level.
    pub fn default_for(license_type: LicenseType) -> Self {
        match license_type {
            LicenseType::Trial => Self::Basic,
            LicenseType::Standard => Self::Standard,
            LicenseType::Professional => Self::Advanced,
            LicenseType::Enterprise => Self::Full,
        }
    }
}

// ---------------------------------------------------------------------------
// Plugin permissions
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

/// Capability record for a single plugin.
///
/// Stored as one entry of the `plugin_permissions` JSONB object:
///
/// ```json
/// { "klippel_qc": { "can_view": true, "can_edit": true, "can_export": false, "can_configure": false } }
/// ```
///
/// `can_view` defaults to `true`; every other flag defaults to `false`.
/// Unknown keys are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginPermission {
    #[serde(default = "default_true")]
    pub can_view: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_export: bool,
    #[serde(default)]
    pub can_configure: bool,
}

impl PluginPermission {
    /// Capabilities granted for a plugin that has no stored record.
    pub fn for_access_level(level: AccessLevel) -> Self {
        Self {
            can_view: true,
            can_edit: level >= AccessLevel::Standard,
            can_export: level >= AccessLevel::Advanced,
            can_configure: level >= AccessLevel::Full,
        }
    }
}

/// Parse and validate a `plugin_permissions` JSON object.
pub fn parse_plugin_permissions(
    value: &serde_json::Value,
) -> Result<BTreeMap<String, PluginPermission>, String> {
    if value.is_null() {
        return Ok(BTreeMap::new());
    }
    let parsed: BTreeMap<String, PluginPermission> = serde_json::from_value(value.clone())
        .map_err(|e| format!("Invalid plugin_permissions: {e}"))?;
    for plugin_id in parsed.keys() {
        validate_plugin_id(plugin_id).map_err(|e| e.to_string())?;
    }
    Ok(parsed)
}

/// Validate a plugin identifier: non-empty lowercase ASCII, digits and `_`.
pub fn validate_plugin_id(plugin_id: &str) -> Result<(), CoreError> {
    let well_formed = !plugin_id.is_empty()
        && plugin_id.len() <= MAX_PLUGIN_ID_LENGTH
        && plugin_id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid plugin id '{plugin_id}'. Use 1-{MAX_PLUGIN_ID_LENGTH} lowercase letters, digits or underscores"
        )))
    }
}

// ---------------------------------------------------------------------------
// License
// ---------------------------------------------------------------------------

/// A license record as loaded from the License Store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct License {
    pub id: DbId,
    pub license_key: String,
    pub license_type: LicenseType,
    pub status: LicenseStatus,
    pub time_limit_type: TimeLimitType,
    pub custom_trial_days: Option<i32>,
    pub expires_at: Option<Timestamp>,
    pub enabled_plugins: BTreeSet<String>,
    pub plugin_permissions: BTreeMap<String, PluginPermission>,
    pub allowed_user_types: BTreeSet<String>,
    pub access_level: AccessLevel,
    /// `None` means unlimited.
    pub max_users: Option<i64>,
    pub max_projects: Option<i64>,
    pub max_storage_gb: Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl License {
    pub fn is_active(&self) -> bool {
        self.status == LicenseStatus::Active
    }

    pub fn is_trial(&self) -> bool {
        self.license_type == LicenseType::Trial
    }

    /// Trial length in days derived from the time-limit type, if any.
    pub fn trial_days(&self) -> Option<i64> {
        match self.time_limit_type {
            TimeLimitType::Trial30 => Some(TRIAL_30_DAYS),
            TimeLimitType::TrialCustom => self.custom_trial_days.map(i64::from),
            TimeLimitType::Unlimited | TimeLimitType::FixedPeriod => None,
        }
    }

    /// End of the trial window, counted from license creation.
    ///
    /// Saturates at the latest representable instant instead of overflowing.
    pub fn trial_ends_at(&self) -> Option<Timestamp> {
        self.trial_days().map(|days| {
            chrono::Duration::try_days(days)
                .and_then(|span| self.created_at.checked_add_signed(span))
                .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
        })
    }

    /// Whether any time rule applies to this license.
    pub fn is_time_limited(&self) -> bool {
        self.expires_at.is_some() || self.time_limit_type != TimeLimitType::Unlimited
    }

    /// Capabilities for an enabled plugin: the stored record if present,
    /// otherwise the access-level defaults.
    pub fn plugin_permission(&self, plugin_id: &str) -> Option<PluginPermission> {
        if !self.enabled_plugins.contains(plugin_id) {
            return None;
        }
        Some(
            self.plugin_permissions
                .get(plugin_id)
                .copied()
                .unwrap_or_else(|| PluginPermission::for_access_level(self.access_level)),
        )
    }
}

// ---------------------------------------------------------------------------
// Derived field maintenance
// ---------------------------------------------------------------------------

/// Administrator request to change the derived license fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitlementUpdate {
    pub enabled_plugins: Option<Vec<String>>,
    pub access_level: Option<AccessLevel>,
    pub time_limit_type: Option<TimeLimitType>,
    pub custom_trial_days: Option<i32>,
}

/// The derived fields written back to the License Store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedLicenseFields {
    pub enabled_plugins: BTreeSet<String>,
    pub access_level: AccessLevel,
    pub time_limit_type: TimeLimitType,
    pub custom_trial_days: Option<i32>,
}

/// Merge an update into the current license fields and validate the result.
///
/// An omitted field keeps its stored value. Switching away from
/// `trial_custom` clears `custom_trial_days`.
pub fn resolve_entitlement_update(
    license: &License,
    update: &EntitlementUpdate,
) -> Result<DerivedLicenseFields, CoreError> {
    let enabled_plugins = match &update.enabled_plugins {
        Some(plugins) => {
            for plugin_id in plugins {
                validate_plugin_id(plugin_id)?;
            }
            plugins.iter().cloned().collect()
        }
        None => license.enabled_plugins.clone(),
    };

    let access_level = update.access_level.unwrap_or(license.access_level);

    let time_limit_type = update.time_limit_type.unwrap_or(license.time_limit_type);

    let custom_trial_days = if time_limit_type == TimeLimitType::TrialCustom {
        let days = update.custom_trial_days.or(license.custom_trial_days);
        match days {
            Some(d) if d > MAX_CUSTOM_TRIAL_DAYS => {
                return Err(CoreError::Validation(format!(
                    "custom_trial_days must not exceed {MAX_CUSTOM_TRIAL_DAYS}"
                )))
            }
            Some(d) if d > 0 => Some(d),
            _ => {
                return Err(CoreError::Validation(
                    "trial_custom licenses require a positive custom_trial_days".to_string(),
                ))
            }
        }
    } else {
        None
    };

    Ok(DerivedLicenseFields {
        enabled_plugins,
        access_level,
        time_limit_type,
        custom_trial_days,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
