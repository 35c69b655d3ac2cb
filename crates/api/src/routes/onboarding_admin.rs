//! Route definitions for onboarding automation and reminders.
//!
//! Mounted at `/admin/onboarding` by `api_routes()`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{automation, reminders};
use crate::state::AppState;

/// ```text
/// POST   /automation/trigger   -> trigger_automation
/// GET    /automation/logs      -> list_automation_logs
/// POST   /reminders/send       -> send_reminders
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/automation/trigger", post(automation::trigger_automation))
        .route("/automation/logs", get(automation::list_automation_logs))
        .route("/reminders/send", post(reminders::send_reminders))
}
