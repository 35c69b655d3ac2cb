//! Handler for manual reminder dispatch.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use lyc_core::types::DbId;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireOperator;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body: exactly one of `id` or `send_all: true`.
#[derive(Debug, Deserialize)]
pub struct SendRemindersInput {
    pub id: Option<DbId>,
    #[serde(default)]
    pub send_all: bool,
}

// ---------------------------------------------------------------------------
// POST /admin/onboarding/reminders/send
// ---------------------------------------------------------------------------

/// Send one pending reminder, or every due reminder.
pub async fn send_reminders(
    RequireOperator(caller): RequireOperator,
    State(state): State<AppState>,
    Json(input): Json<SendRemindersInput>,
) -> AppResult<impl IntoResponse> {
    let dispatcher = state.reminders.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Reminder delivery is not configured".into())
    })?;

    let now = Utc::now();
    let report = match (input.id, input.send_all) {
        (Some(id), false) => dispatcher.dispatch_one(id, now).await?,
        (None, true) => dispatcher.dispatch_due(now).await?,
        _ => {
            return Err(AppError::BadRequest(
                "Provide either id or send_all: true".into(),
            ))
        }
    };

    tracing::info!(
        caller = %caller.user_id,
        total = report.summary.total,
        sent = report.summary.sent,
        failed = report.summary.failed,
        "Manual reminder dispatch"
    );

    Ok(Json(DataResponse { data: report }))
}
