//! Route definitions for license validation.
//!
//! Mounted at `/licenses` by `api_routes()`.

use axum::routing::post;
use axum::Router;

use crate::handlers::license_validation;
use crate::state::AppState;

/// ```text
/// POST   /validate   -> validate_license
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/validate", post(license_validation::validate_license))
}
