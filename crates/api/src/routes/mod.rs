pub mod health;
pub mod license_admin;
pub mod licenses;
pub mod onboarding;
pub mod onboarding_admin;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /licenses/validate                               validate (POST, auth)
///
/// /onboarding/progress/{license_id}                progress + sessions (GET, auth)
/// /onboarding/sessions/{id}/complete               complete session (POST, admin)
///
/// /admin/licenses/{id}/entitlements                update derived fields (PUT, admin)
///
/// /admin/onboarding/automation/trigger             run scheduler (POST, admin/service)
/// /admin/onboarding/automation/logs                audit trail (GET, admin)
/// /admin/onboarding/reminders/send                 dispatch reminders (POST, admin/service)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/licenses", licenses::router())
        .nest("/onboarding", onboarding::router())
        .nest("/admin/licenses", license_admin::router())
        .nest("/admin/onboarding", onboarding_admin::router())
}
