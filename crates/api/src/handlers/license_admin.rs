//! Handlers for license entitlement maintenance.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use lyc_core::error::CoreError;
use lyc_core::license::{resolve_entitlement_update, EntitlementUpdate};
use lyc_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// PUT /admin/licenses/{id}/entitlements
// ---------------------------------------------------------------------------

/// Update enabled plugins, access level and time-limit fields.
///
/// Omitted fields keep their stored values.
pub async fn update_entitlements(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<EntitlementUpdate>,
) -> AppResult<impl IntoResponse> {
    let not_found = || CoreError::NotFound {
        entity: "license",
        id,
    };

    let license = state
        .stores
        .licenses
        .find_by_id(id)
        .await?
        .ok_or_else(not_found)?;

    let fields = resolve_entitlement_update(&license, &input)?;

    let updated = state
        .stores
        .licenses
        .update_derived_fields(id, &fields)
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(
        license_id = id,
        admin = %admin.user_id,
        access_level = %updated.access_level,
        plugins = updated.enabled_plugins.len(),
        "License entitlements updated"
    );

    Ok(Json(DataResponse { data: updated }))
}
