//! Repository for the `onboarding_automation_logs` table. Append-only.

use sqlx::PgPool;

use lyc_core::automation::NewAutomationLogEntry;

use crate::models::automation_log::AutomationLogRow;

/// Column list for `onboarding_automation_logs` queries.
const COLUMNS: &str = "\
    id, user_id, license_id, trigger_type, triggered_by, sessions_created, \
    templates_used, errors, skipped_reason, created_at";

pub struct AutomationLogRepo;

impl AutomationLogRepo {
    pub async fn create(
        pool: &PgPool,
        entry: &NewAutomationLogEntry,
    ) -> Result<AutomationLogRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO onboarding_automation_logs \
                (user_id, license_id, trigger_type, triggered_by, sessions_created, \
                 templates_used, errors, skipped_reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AutomationLogRow>(&query)
            .bind(&entry.user_id)
            .bind(entry.license_id)
            .bind(entry.trigger_type.as_str())
            .bind(&entry.triggered_by)
            .bind(entry.sessions_created)
            .bind(&entry.templates_used)
            .bind(&entry.errors)
            .bind(&entry.skipped_reason)
            .fetch_one(pool)
            .await
    }

    /// Newest first, optionally filtered by user.
    pub async fn list(
        pool: &PgPool,
        user_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AutomationLogRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_automation_logs \
             WHERE ($1::TEXT IS NULL OR user_id = $1) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, AutomationLogRow>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
