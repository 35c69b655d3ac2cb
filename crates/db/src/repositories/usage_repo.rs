//! Usage counters for a license, computed from the consumption tables.

use sqlx::PgPool;

use lyc_core::types::DbId;

/// Raw counters; storage is reported in bytes.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct UsageRow {
    pub users_count: i64,
    pub projects_count: i64,
    pub storage_used_bytes: i64,
}

pub struct UsageRepo;

impl UsageRepo {
    /// Count active assignments, live projects and stored bytes in one
    /// statement so the three counters share a snapshot.
    pub async fn current_usage(pool: &PgPool, license_id: DbId) -> Result<UsageRow, sqlx::Error> {
        sqlx::query_as::<_, UsageRow>(
            "SELECT \
                (SELECT COUNT(*) FROM license_assignments \
                  WHERE license_id = $1 AND revoked_at IS NULL) AS users_count, \
                (SELECT COUNT(*) FROM license_projects \
                  WHERE license_id = $1 AND archived_at IS NULL) AS projects_count, \
                (SELECT COALESCE(SUM(size_bytes), 0)::BIGINT FROM license_storage_objects \
                  WHERE license_id = $1 AND deleted_at IS NULL) AS storage_used_bytes",
        )
        .bind(license_id)
        .fetch_one(pool)
        .await
    }
}
