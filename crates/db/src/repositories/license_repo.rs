//! Repository for the `licenses` table.

use sqlx::PgPool;

use lyc_core::license::DerivedLicenseFields;
use lyc_core::types::DbId;

use crate::models::license::LicenseRow;

/// Column list for `licenses` queries.
const COLUMNS: &str = "\
    id, license_key, license_type, status, time_limit_type, custom_trial_days, \
    expires_at, enabled_plugins, plugin_permissions, allowed_user_types, \
    access_level, max_users, max_projects, max_storage_gb, created_at, updated_at";

/// Read access to licenses plus updates to their derived fields.
pub struct LicenseRepo;

impl LicenseRepo {
    /// Find a license by its key, whatever its status.
    pub async fn find_by_key(
        pool: &PgPool,
        license_key: &str,
    ) -> Result<Option<LicenseRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM licenses WHERE license_key = $1");
        sqlx::query_as::<_, LicenseRow>(&query)
            .bind(license_key)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<LicenseRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM licenses WHERE id = $1");
        sqlx::query_as::<_, LicenseRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the derived entitlement fields. Returns `None` if no row
    /// matched.
    pub async fn update_derived_fields(
        pool: &PgPool,
        id: DbId,
        fields: &DerivedLicenseFields,
    ) -> Result<Option<LicenseRow>, sqlx::Error> {
        let query = format!(
            "UPDATE licenses SET \
                enabled_plugins = $2, \
                access_level = $3, \
                time_limit_type = $4, \
                custom_trial_days = $5, \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let plugins: Vec<String> = fields.enabled_plugins.iter().cloned().collect();
        sqlx::query_as::<_, LicenseRow>(&query)
            .bind(id)
            .bind(plugins)
            .bind(fields.access_level.as_str())
            .bind(fields.time_limit_type.as_str())
            .bind(fields.custom_trial_days)
            .fetch_optional(pool)
            .await
    }
}
