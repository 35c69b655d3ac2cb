//! Handlers for onboarding progress and session completion.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use lyc_core::error::CoreError;
use lyc_core::onboarding::progress::{
    is_past_deadline, next_steps, progress_warnings, remaining_sessions,
};
use lyc_core::onboarding::{OnboardingProgress, OnboardingSession};
use lyc_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub user_id: Option<String>,
}

/// Progress for one (user, license) pair with its sessions.
#[derive(Debug, Serialize)]
pub struct ProgressView {
    pub progress: OnboardingProgress,
    pub sessions: Vec<OnboardingSession>,
    pub remaining_sessions: i32,
    pub past_deadline: bool,
    pub warnings: Vec<String>,
    pub next_steps: Vec<String>,
}

// ---------------------------------------------------------------------------
// GET /onboarding/progress/{license_id}
// ---------------------------------------------------------------------------

/// Fetch onboarding progress and sessions.
///
/// Regular users see their own progress; operators pass `?user_id=`.
pub async fn get_progress(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(license_id): Path<DbId>,
    Query(query): Query<ProgressQuery>,
) -> AppResult<impl IntoResponse> {
    let user_id = auth
        .resolve_subject(query.user_id)?
        .ok_or_else(|| AppError::BadRequest("user_id is required".into()))?;

    let progress = state
        .stores
        .onboarding
        .find_progress(&user_id, license_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "onboarding_progress",
            id: license_id,
        })?;

    let sessions = state
        .stores
        .onboarding
        .list_sessions(&user_id, license_id)
        .await?;

    let now = Utc::now();
    let view = ProgressView {
        remaining_sessions: remaining_sessions(&progress),
        past_deadline: is_past_deadline(&progress, now),
        warnings: progress_warnings(&progress, now),
        next_steps: next_steps(&progress),
        progress,
        sessions,
    };

    Ok(Json(DataResponse { data: view }))
}

// ---------------------------------------------------------------------------
// POST /onboarding/sessions/{id}/complete
// ---------------------------------------------------------------------------

/// Mark a session completed and return the updated progress.
pub async fn complete_session(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let progress = state.automation.complete_session(id, Utc::now()).await?;

    tracing::info!(
        session_id = id,
        admin = %admin.user_id,
        sessions_completed = progress.sessions_completed,
        status = %progress.overall_status,
        "Onboarding session completed"
    );

    Ok(Json(DataResponse { data: progress }))
}
