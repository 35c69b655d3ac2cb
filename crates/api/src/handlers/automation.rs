//! Handlers for onboarding automation.
//!
//! The trigger endpoint accepts license assignment events from administrators
//! and from the service principal that relays assignment webhooks.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use lyc_core::automation::AssignmentEvent;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireOperator};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /admin/onboarding/automation/logs`.
#[derive(Debug, Deserialize)]
pub struct AutomationLogQuery {
    pub user_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// POST /admin/onboarding/automation/trigger
// ---------------------------------------------------------------------------

/// Run the scheduler for one assignment event.
///
/// `triggered_by` defaults to the caller.
pub async fn trigger_automation(
    RequireOperator(caller): RequireOperator,
    State(state): State<AppState>,
    Json(mut event): Json<AssignmentEvent>,
) -> AppResult<impl IntoResponse> {
    if event.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id must not be empty".into()));
    }
    if event.triggered_by.is_none() {
        event.triggered_by = Some(caller.user_id);
    }

    let report = state.automation.handle_assignment(&event, Utc::now()).await?;

    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// GET /admin/onboarding/automation/logs
// ---------------------------------------------------------------------------

/// List automation runs, newest first.
pub async fn list_automation_logs(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<AutomationLogQuery>,
) -> AppResult<impl IntoResponse> {
    let page = PaginationParams {
        limit: query.limit,
        offset: query.offset,
    };

    let logs = state
        .stores
        .onboarding
        .list_automation_logs(query.user_id.as_deref(), page.limit(), page.offset())
        .await?;

    Ok(Json(DataResponse { data: logs }))
}
