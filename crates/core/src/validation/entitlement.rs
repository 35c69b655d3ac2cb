//! Entitlement resolver -- pure logic over a license record.
//!
//! Handles the user-type and plugin checks and synthesizes the permission
//! set and restriction summary returned on a grant.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::license::{AccessLevel, License, PluginPermission};
use crate::types::Timestamp;

use super::usage::UsageCounts;
use super::{Denial, DenialReason};

/// Plugin that grants API access regardless of access level.
pub const PLUGIN_API_ACCESS: &str = "api_access";

/// Plugin that grants collaboration regardless of access level.
pub const PLUGIN_COLLABORATION: &str = "collaboration";

/// Capabilities conferred by a license.
///
/// Per-plugin records are flattened next to the feature flags, so a client
/// reads `permissions.klippel_qc.can_edit` directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub access_level: AccessLevel,
    pub can_export_data: bool,
    pub can_use_api: bool,
    pub can_collaborate: bool,
    pub can_create_projects: bool,
    pub can_invite_users: bool,
    #[serde(flatten)]
    pub plugins: BTreeMap<String, PluginPermission>,
}

/// Informational summary of what the license restricts. Always returned on a
/// grant, whatever the request asked for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Restrictions {
    pub time_limited: bool,
    pub plugin_restricted: bool,
    pub user_type_restricted: bool,
    pub max_users: Option<i64>,
    pub max_projects: Option<i64>,
    pub max_storage_gb: Option<f64>,
    pub expires_at: Option<Timestamp>,
}

/// Deny when the license restricts user types and `user_type` is not listed.
/// An empty `allowed_user_types` set allows everyone.
pub fn check_user_type(license: &License, user_type: Option<&str>) -> Result<(), Denial> {
    let Some(user_type) = user_type else {
        return Ok(());
    };
    if license.allowed_user_types.is_empty() || license.allowed_user_types.contains(user_type) {
        return Ok(());
    }
    Err(Denial::new(
        DenialReason::UserTypeNotAllowed,
        format!("User type '{user_type}' is not allowed for this license"),
    )
    .with_allowed_user_types(license.allowed_user_types.iter().cloned().collect()))
}

/// Deny when a plugin is requested that the license does not enable.
pub fn check_plugin(license: &License, plugin: Option<&str>) -> Result<(), Denial> {
    let Some(plugin) = plugin else {
        return Ok(());
    };
    if license.enabled_plugins.contains(plugin) {
        return Ok(());
    }
    Err(Denial::new(
        DenialReason::PluginNotEnabled,
        format!("Plugin '{plugin}' is not enabled for this license"),
    )
    .with_enabled_plugins(license.enabled_plugins.iter().cloned().collect()))
}

fn below_ceiling(count: i64, ceiling: Option<i64>) -> bool {
    ceiling.map_or(true, |max| count < max)
}

/// Build the permission set from access level, enabled plugins and usage.
pub fn resolve_permissions(license: &License, usage: &UsageCounts) -> Permissions {
    let level = license.access_level;
    let has_plugin = |id: &str| license.enabled_plugins.contains(id);

    let plugins = license
        .enabled_plugins
        .iter()
        .filter_map(|id| license.plugin_permission(id).map(|perm| (id.clone(), perm)))
        .collect();

    Permissions {
        access_level: level,
        can_export_data: level >= AccessLevel::Standard,
        can_use_api: level >= AccessLevel::Advanced || has_plugin(PLUGIN_API_ACCESS),
        can_collaborate: level >= AccessLevel::Advanced || has_plugin(PLUGIN_COLLABORATION),
        can_create_projects: below_ceiling(usage.projects_count, license.max_projects),
        can_invite_users: below_ceiling(usage.users_count, license.max_users),
        plugins,
    }
}

pub fn summarize_restrictions(license: &License) -> Restrictions {
    Restrictions {
        time_limited: license.is_time_limited(),
        plugin_restricted: !license.enabled_plugins.is_empty(),
        user_type_restricted: !license.allowed_user_types.is_empty(),
        max_users: license.max_users,
        max_projects: license.max_projects,
        max_storage_gb: license.max_storage_gb,
        expires_at: license.expires_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::tests::sample_license;
    use crate::license::TimeLimitType;

    #[test]
    fn user_type_allowed_when_set_is_empty() {
        let license = sample_license();
        assert!(check_user_type(&license, Some("student")).is_ok());
        assert!(check_user_type(&license, None).is_ok());
    }

    #[test]
    fn user_type_outside_set_is_denied_with_context() {
        let mut license = sample_license();
        license.allowed_user_types = ["engineer".to_string()].into_iter().collect();
        let denial = check_user_type(&license, Some("student")).unwrap_err();
        assert_eq!(denial.reason, DenialReason::UserTypeNotAllowed);
        assert_eq!(denial.allowed_user_types, Some(vec!["engineer".to_string()]));
        assert!(check_user_type(&license, Some("engineer")).is_ok());
    }

    #[test]
    fn plugin_not_enabled_is_denied_with_context() {
        let license = sample_license();
        let denial = check_plugin(&license, Some("advanced_analytics")).unwrap_err();
        assert_eq!(denial.reason, DenialReason::PluginNotEnabled);
        assert_eq!(
            denial.enabled_plugins,
            Some(vec!["apx500".to_string(), "klippel_qc".to_string()])
        );
        assert!(check_plugin(&license, Some("klippel_qc")).is_ok());
        assert!(check_plugin(&license, None).is_ok());
    }

    #[test]
    fn capabilities_use_access_level_ordering() {
        let mut license = sample_license();
        let usage = UsageCounts::default();

        license.access_level = AccessLevel::Basic;
        let perms = resolve_permissions(&license, &usage);
        assert!(!perms.can_export_data && !perms.can_use_api && !perms.can_collaborate);

        license.access_level = AccessLevel::Standard;
        let perms = resolve_permissions(&license, &usage);
        assert!(perms.can_export_data && !perms.can_use_api);

        license.access_level = AccessLevel::Full;
        let perms = resolve_permissions(&license, &usage);
        assert!(perms.can_export_data && perms.can_use_api && perms.can_collaborate);
    }

    #[test]
    fn plugins_grant_api_and_collaboration_at_low_levels() {
        let mut license = sample_license();
        license.access_level = AccessLevel::Basic;
        license.enabled_plugins.insert(PLUGIN_API_ACCESS.to_string());
        license.enabled_plugins.insert(PLUGIN_COLLABORATION.to_string());
        let perms = resolve_permissions(&license, &UsageCounts::default());
        assert!(perms.can_use_api);
        assert!(perms.can_collaborate);
    }

    #[test]
    fn usage_drives_create_and_invite_flags() {
        let mut license = sample_license();
        license.max_users = Some(3);
        license.max_projects = Some(2);
        let usage = UsageCounts {
            users_count: 2,
            projects_count: 2,
            storage_used_gb: 0.0,
        };
        let perms = resolve_permissions(&license, &usage);
        assert!(perms.can_invite_users);
        assert!(!perms.can_create_projects);
    }

    #[test]
    fn permissions_include_every_enabled_plugin() {
        let license = sample_license();
        let perms = resolve_permissions(&license, &UsageCounts::default());
        assert!(perms.plugins.contains_key("klippel_qc"));
        assert!(perms.plugins.contains_key("apx500"));

        let json = serde_json::to_value(&perms).unwrap();
        assert_eq!(json["klippel_qc"]["can_configure"], true);
        assert_eq!(json["access_level"], "full");
    }

    #[test]
    fn restriction_summary_reports_derived_flags() {
        let mut license = sample_license();
        let summary = summarize_restrictions(&license);
        assert!(!summary.time_limited);
        assert!(summary.plugin_restricted);
        assert!(!summary.user_type_restricted);

        license.time_limit_type = TimeLimitType::FixedPeriod;
        license.allowed_user_types.insert("engineer".into());
        license.max_users = Some(10);
        let summary = summarize_restrictions(&license);
        assert!(summary.time_limited);
        assert!(summary.user_type_restricted);
        assert_eq!(summary.max_users, Some(10));
    }
}
