//! Route definitions for onboarding progress.
//!
//! Mounted at `/onboarding` by `api_routes()`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::onboarding;
use crate::state::AppState;

/// ```text
/// GET    /progress/{license_id}     -> get_progress
/// POST   /sessions/{id}/complete    -> complete_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/progress/{license_id}", get(onboarding::get_progress))
        .route("/sessions/{id}/complete", post(onboarding::complete_session))
}
