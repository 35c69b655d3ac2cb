//! Automation log row model.

use sqlx::FromRow;

use lyc_core::automation::{AutomationLogEntry, TriggerType};
use lyc_core::error::StoreError;
use lyc_core::types::{DbId, Timestamp};

use super::parse_column;

/// A row from the `onboarding_automation_logs` table.
#[derive(Debug, Clone, FromRow)]
pub struct AutomationLogRow {
    pub id: DbId,
    pub user_id: String,
    pub license_id: DbId,
    pub trigger_type: String,
    pub triggered_by: Option<String>,
    pub sessions_created: i32,
    pub templates_used: Vec<DbId>,
    pub errors: Vec<String>,
    pub skipped_reason: Option<String>,
    pub created_at: Timestamp,
}

impl TryFrom<AutomationLogRow> for AutomationLogEntry {
    type Error = StoreError;

    fn try_from(row: AutomationLogRow) -> Result<Self, Self::Error> {
        Ok(AutomationLogEntry {
            id: row.id,
            user_id: row.user_id,
            license_id: row.license_id,
            trigger_type: parse_column("trigger_type", &row.trigger_type, TriggerType::from_str_value)?,
            triggered_by: row.triggered_by,
            sessions_created: row.sessions_created,
            templates_used: row.templates_used,
            errors: row.errors,
            skipped_reason: row.skipped_reason,
            created_at: row.created_at,
        })
    }
}
