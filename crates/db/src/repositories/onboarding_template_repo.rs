//! Repository for the `onboarding_templates` table.

use sqlx::PgPool;

use crate::models::onboarding::TemplateRow;

/// Column list for `onboarding_templates` queries.
const COLUMNS: &str = "\
    id, plugin_id, session_type, title, description, license_types, \
    auto_create_on_license, is_mandatory, priority_order, duration_minutes, is_active";

pub struct OnboardingTemplateRepo;

impl OnboardingTemplateRepo {
    /// Active templates in priority order.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<TemplateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_templates \
             WHERE is_active \
             ORDER BY priority_order, id"
        );
        sqlx::query_as::<_, TemplateRow>(&query).fetch_all(pool).await
    }
}
