//! Repository for the `onboarding_reminders` table.

use sqlx::PgPool;

use lyc_core::onboarding::{NewOnboardingReminder, ReminderStatus};
use lyc_core::types::{DbId, Timestamp};

use crate::models::onboarding::ReminderRow;

/// Column list for `onboarding_reminders` queries.
const COLUMNS: &str = "\
    id, user_id, license_id, session_id, reminder_type, message, scheduled_for, \
    status, sent_at, last_error, created_at";

pub struct OnboardingReminderRepo;

impl OnboardingReminderRepo {
    pub async fn create(
        pool: &PgPool,
        input: &NewOnboardingReminder,
    ) -> Result<ReminderRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO onboarding_reminders \
                (user_id, license_id, session_id, reminder_type, message, scheduled_for) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReminderRow>(&query)
            .bind(&input.user_id)
            .bind(input.license_id)
            .bind(input.session_id)
            .bind(&input.reminder_type)
            .bind(&input.message)
            .bind(input.scheduled_for)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ReminderRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM onboarding_reminders WHERE id = $1");
        sqlx::query_as::<_, ReminderRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Pending reminders due at `now`, oldest first.
    pub async fn list_due(pool: &PgPool, now: Timestamp) -> Result<Vec<ReminderRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_reminders \
             WHERE status = $1 AND scheduled_for <= $2 \
             ORDER BY scheduled_for, id"
        );
        sqlx::query_as::<_, ReminderRow>(&query)
            .bind(ReminderStatus::Pending.as_str())
            .bind(now)
            .fetch_all(pool)
            .await
    }

    /// Transitions only a `pending` row; returns whether one was updated.
    pub async fn mark_sent(pool: &PgPool, id: DbId, sent_at: Timestamp) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE onboarding_reminders \
             SET status = $2, sent_at = $3, last_error = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(ReminderStatus::Sent.as_str())
        .bind(sent_at)
        .bind(ReminderStatus::Pending.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_failed(pool: &PgPool, id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE onboarding_reminders \
             SET status = $2, last_error = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(ReminderStatus::Failed.as_str())
        .bind(error)
        .bind(ReminderStatus::Pending.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
