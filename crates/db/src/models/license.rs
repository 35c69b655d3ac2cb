//! License row model.

use sqlx::FromRow;

use lyc_core::error::StoreError;
use lyc_core::license::{
    parse_plugin_permissions, AccessLevel, License, LicenseStatus, LicenseType, TimeLimitType,
};
use lyc_core::types::{DbId, Timestamp};

use super::parse_column;

/// A row from the `licenses` table.
#[derive(Debug, Clone, FromRow)]
pub struct LicenseRow {
    pub id: DbId,
    pub license_key: String,
    pub license_type: String,
    pub status: String,
    pub time_limit_type: String,
    pub custom_trial_days: Option<i32>,
    pub expires_at: Option<Timestamp>,
    pub enabled_plugins: Vec<String>,
    pub plugin_permissions: serde_json::Value,
    pub allowed_user_types: Vec<String>,
    pub access_level: Option<String>,
    pub max_users: Option<i64>,
    pub max_projects: Option<i64>,
    pub max_storage_gb: Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<LicenseRow> for License {
    type Error = StoreError;

    fn try_from(row: LicenseRow) -> Result<Self, Self::Error> {
        let plugin_permissions = parse_plugin_permissions(&row.plugin_permissions)
            .map_err(|e| StoreError::Malformed(format!("license {}: {e}", row.id)))?;

        let license_type =
            parse_column("license_type", &row.license_type, LicenseType::from_str_value)?;
        let access_level = match row.access_level.as_deref() {
            Some(raw) => parse_column("access_level", raw, AccessLevel::from_str_value)?,
            None => AccessLevel::default_for(license_type),
        };

        Ok(License {
            id: row.id,
            license_key: row.license_key,
            license_type,
            status: parse_column("status", &row.status, LicenseStatus::from_str_value)?,
            time_limit_type: parse_column(
                "time_limit_type",
                &row.time_limit_type,
                TimeLimitType::from_str_value,
            )?,
            custom_trial_days: row.custom_trial_days,
            expires_at: row.expires_at,
            enabled_plugins: row.enabled_plugins.into_iter().collect(),
            plugin_permissions,
            allowed_user_types: row.allowed_user_types.into_iter().collect(),
            access_level,
            max_users: row.max_users,
            max_projects: row.max_projects,
            max_storage_gb: row.max_storage_gb,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
