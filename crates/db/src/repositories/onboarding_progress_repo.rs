//! Repository for the `onboarding_progress` table.

use sqlx::PgPool;

use lyc_core::onboarding::{ProgressDraft, ProgressStatus};
use lyc_core::types::DbId;

use crate::models::onboarding::ProgressRow;

/// Column list for `onboarding_progress` queries.
const COLUMNS: &str = "\
    id, user_id, license_id, total_sessions_required, plugin_sessions_required, \
    sessions_completed, overall_status, onboarding_deadline, license_active_status, \
    started_at, completed_at, created_at, updated_at";

pub struct OnboardingProgressRepo;

impl OnboardingProgressRepo {
    pub async fn find(
        pool: &PgPool,
        user_id: &str,
        license_id: DbId,
    ) -> Result<Option<ProgressRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_progress \
             WHERE user_id = $1 AND license_id = $2"
        );
        sqlx::query_as::<_, ProgressRow>(&query)
            .bind(user_id)
            .bind(license_id)
            .fetch_optional(pool)
            .await
    }

    /// Whether the user completed onboarding on any license.
    pub async fn has_completed(pool: &PgPool, user_id: &str) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (\
                SELECT 1 FROM onboarding_progress \
                WHERE user_id = $1 AND overall_status = $2\
             )",
        )
        .bind(user_id)
        .bind(ProgressStatus::Completed.as_str())
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Insert a progress row. Fails with `uq_onboarding_progress_user_license`
    /// if one already exists for the pair.
    pub async fn insert(pool: &PgPool, draft: &ProgressDraft) -> Result<ProgressRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO onboarding_progress \
                (user_id, license_id, total_sessions_required, plugin_sessions_required, \
                 sessions_completed, overall_status, onboarding_deadline, \
                 license_active_status, started_at, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProgressRow>(&query)
            .bind(&draft.user_id)
            .bind(draft.license_id)
            .bind(draft.total_sessions_required)
            .bind(plugin_counts_json(draft))
            .bind(draft.sessions_completed)
            .bind(draft.overall_status.as_str())
            .bind(draft.onboarding_deadline)
            .bind(draft.license_active_status)
            .bind(draft.started_at)
            .bind(draft.completed_at)
            .fetch_one(pool)
            .await
    }

    /// Overwrite every writable field of an existing row.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        draft: &ProgressDraft,
    ) -> Result<ProgressRow, sqlx::Error> {
        let query = format!(
            "UPDATE onboarding_progress SET \
                total_sessions_required = $2, \
                plugin_sessions_required = $3, \
                sessions_completed = $4, \
                overall_status = $5, \
                onboarding_deadline = $6, \
                license_active_status = $7, \
                started_at = $8, \
                completed_at = $9, \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProgressRow>(&query)
            .bind(id)
            .bind(draft.total_sessions_required)
            .bind(plugin_counts_json(draft))
            .bind(draft.sessions_completed)
            .bind(draft.overall_status.as_str())
            .bind(draft.onboarding_deadline)
            .bind(draft.license_active_status)
            .bind(draft.started_at)
            .bind(draft.completed_at)
            .fetch_one(pool)
            .await
    }
}

fn plugin_counts_json(draft: &ProgressDraft) -> serde_json::Value {
    serde_json::Value::Object(
        draft
            .plugin_sessions_required
            .iter()
            .map(|(plugin, count)| (plugin.clone(), serde_json::Value::from(*count)))
            .collect(),
    )
}
