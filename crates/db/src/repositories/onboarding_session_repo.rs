//! Repository for the `onboarding_sessions` table.

use sqlx::PgPool;

use lyc_core::onboarding::{NewOnboardingSession, SessionStatus};
use lyc_core::types::{DbId, Timestamp};

use crate::models::onboarding::SessionRow;

/// Column list for `onboarding_sessions` queries.
const COLUMNS: &str = "\
    id, user_id, license_id, template_id, plugin_id, session_type, session_number, \
    title, description, status, scheduled_at, completed_at, created_at";

pub struct OnboardingSessionRepo;

impl OnboardingSessionRepo {
    pub async fn create(
        pool: &PgPool,
        input: &NewOnboardingSession,
    ) -> Result<SessionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO onboarding_sessions \
                (user_id, license_id, template_id, plugin_id, session_type, \
                 session_number, title, description, status, scheduled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(&input.user_id)
            .bind(input.license_id)
            .bind(input.template_id)
            .bind(&input.plugin_id)
            .bind(&input.session_type)
            .bind(input.session_number)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.status.as_str())
            .bind(input.scheduled_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM onboarding_sessions WHERE id = $1");
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Sessions for a (user, license) pair in session-number order.
    pub async fn list_for_user_license(
        pool: &PgPool,
        user_id: &str,
        license_id: DbId,
    ) -> Result<Vec<SessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_sessions \
             WHERE user_id = $1 AND license_id = $2 \
             ORDER BY session_number, id"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(user_id)
            .bind(license_id)
            .fetch_all(pool)
            .await
    }

    pub async fn mark_completed(
        pool: &PgPool,
        id: DbId,
        completed_at: Timestamp,
    ) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!(
            "UPDATE onboarding_sessions SET status = $2, completed_at = $3, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .bind(SessionStatus::Completed.as_str())
            .bind(completed_at)
            .fetch_optional(pool)
            .await
    }
}
