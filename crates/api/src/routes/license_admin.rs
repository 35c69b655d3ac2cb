//! Route definitions for license administration.
//!
//! Mounted at `/admin/licenses` by `api_routes()`.

use axum::routing::put;
use axum::Router;

use crate::handlers::license_admin;
use crate::state::AppState;

/// ```text
/// PUT    /{id}/entitlements   -> update_entitlements
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}/entitlements",
        put(license_admin::update_entitlements),
    )
}
