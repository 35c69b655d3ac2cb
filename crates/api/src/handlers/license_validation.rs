//! Handler for license validation.
//!
//! Validation always answers with a `{ "valid": ... }` body. Denials carry a
//! reason code and context fields; the HTTP status reflects the reason.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use lyc_core::error::CoreError;
use lyc_core::validation::{DenialReason, ValidationRequest, ValidationResult};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Request body for `POST /licenses/validate`.
#[derive(Debug, Deserialize, Validate)]
pub struct ValidateLicenseInput {
    #[validate(length(min = 1, max = 128))]
    pub license_key: String,
    #[validate(length(min = 1, max = 255))]
    pub user_id: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub user_type: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub requested_plugin: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub requested_action: Option<String>,
}

#[derive(Serialize)]
struct ValidationBody<'a, T: Serialize> {
    valid: bool,
    #[serde(flatten)]
    body: &'a T,
}

/// HTTP status for a denial reason.
pub fn denial_status(reason: DenialReason) -> StatusCode {
    match reason {
        DenialReason::LicenseNotFound => StatusCode::NOT_FOUND,
        DenialReason::UsageCheckFailed => StatusCode::SERVICE_UNAVAILABLE,
        DenialReason::ValidationError => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::FORBIDDEN,
    }
}

/// Render a validation result as its HTTP response.
pub fn render_result(result: &ValidationResult) -> Response {
    match result {
        ValidationResult::Granted(grant) => (
            StatusCode::OK,
            Json(ValidationBody {
                valid: true,
                body: grant,
            }),
        )
            .into_response(),
        ValidationResult::Denied(denial) => (
            denial_status(denial.reason),
            Json(ValidationBody {
                valid: false,
                body: denial,
            }),
        )
            .into_response(),
    }
}

// ---------------------------------------------------------------------------
// POST /licenses/validate
// ---------------------------------------------------------------------------

/// Validate a license for the calling principal.
///
/// Regular users validate for themselves; `user_id` defaults to the token
/// subject. Operators may validate on behalf of any user.
pub async fn validate_license(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ValidateLicenseInput>,
) -> AppResult<Response> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    let user_id = auth.resolve_subject(input.user_id)?;

    let request = ValidationRequest {
        license_key: input.license_key,
        user_id,
        user_type: input.user_type,
        requested_plugin: input.requested_plugin,
        requested_action: input.requested_action,
    };

    let result = state.validator.validate(&request, Utc::now()).await;
    Ok(render_result(&result))
}
