//! HTTP-level integration tests for `POST /api/v1/licenses/validate`.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{
    admin_token, body_json, license, post_json, post_json_auth, service_token, user_token,
    MemoryStores,
};
use lyc_core::license::LicenseType;
use lyc_core::onboarding::gate::GateConfig;
use lyc_core::validation::usage::UsageCounts;
use serde_json::json;
use sqlx::PgPool;

const VALIDATE: &str = "/api/v1/licenses/validate";

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn validate_requires_bearer_token(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(app, VALIDATE, json!({ "license_key": "LYC-ENT-2024-SAMPLE01" })).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn user_cannot_validate_for_someone_else(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = json!({ "license_key": "LYC-ENT-2024-SAMPLE01", "user_id": "user-2" });
    let response = post_json_auth(app, VALIDATE, &user_token("user-1"), body).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], "FORBIDDEN");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_license_key_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json_auth(app, VALIDATE, &user_token("user-1"), json!({ "license_key": "" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Seeded license outcomes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn enterprise_sample_grants_requested_plugin(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = json!({
        "license_key": "LYC-ENT-2024-SAMPLE01",
        "requested_plugin": "klippel_qc",
    });
    let response = post_json_auth(app, VALIDATE, &user_token("user-1"), body).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["valid"], true);
    assert_eq!(json["license_type"], "enterprise");
    assert_eq!(json["permissions"]["access_level"], "full");
    assert_eq!(json["permissions"]["klippel_qc"]["can_view"], true);
    assert_eq!(json["permissions"]["apx500"]["can_view"], true);
    assert_eq!(json["restrictions"]["plugin_restricted"], true);
    assert_eq!(json["current_usage"]["users_count"], 0);
    assert!(json["warnings"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn professional_sample_denies_unlicensed_plugin(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = json!({
        "license_key": "LYC-PRO-2024-SAMPLE02",
        "requested_plugin": "klippel_qc",
    });
    let response = post_json_auth(app, VALIDATE, &user_token("user-1"), body).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["valid"], false);
    assert_eq!(json["reason"], "plugin_not_enabled");
    assert_eq!(json["enabled_plugins"], json!(["advanced_analytics"]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_key_is_license_not_found(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = json!({ "license_key": "LYC-NOPE-0000" });
    let response = post_json_auth(app, VALIDATE, &user_token("user-1"), body).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["valid"], false);
    assert_eq!(json["reason"], "license_not_found");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn suspended_license_is_license_not_found(pool: PgPool) {
    sqlx::query("UPDATE licenses SET status = 'suspended' WHERE license_key = 'LYC-ENT-2024-SAMPLE01'")
        .execute(&pool)
        .await
        .unwrap();
    let app = common::build_test_app(pool);
    let body = json!({ "license_key": "LYC-ENT-2024-SAMPLE01" });
    let response = post_json_auth(app, VALIDATE, &user_token("user-1"), body).await;

    assert_eq!(body_json(response).await["reason"], "license_not_found");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_license_reports_expiry(pool: PgPool) {
    sqlx::query(
        "UPDATE licenses SET expires_at = NOW() - INTERVAL '1 day' \
         WHERE license_key = 'LYC-ENT-2024-SAMPLE01'",
    )
    .execute(&pool)
    .await
    .unwrap();
    let app = common::build_test_app(pool);
    let body = json!({ "license_key": "LYC-ENT-2024-SAMPLE01", "requested_plugin": "klippel_qc" });
    let response = post_json_auth(app, VALIDATE, &user_token("user-1"), body).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["reason"], "license_expired");
    assert!(json["expires_at"].is_string());
}

// ---------------------------------------------------------------------------
// Trial onboarding gate
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn trial_without_user_requires_onboarding(pool: PgPool) {
    let app = common::build_test_app(pool);
    // Operators may omit user_id; the trial gate then has nobody to check.
    let body = json!({ "license_key": "LYC-TRL-2024-SAMPLE03" });
    let response = post_json_auth(app, VALIDATE, &service_token(), body).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["reason"], "onboarding_required");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn trial_user_without_progress_requires_onboarding(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = json!({ "license_key": "LYC-TRL-2024-SAMPLE03" });
    let response = post_json_auth(app, VALIDATE, &user_token("trial-user"), body).await;

    assert_eq!(body_json(response).await["reason"], "onboarding_required");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn trial_user_with_scheduled_onboarding_is_granted_with_warning(pool: PgPool) {
    let app = common::build_test_app(pool);

    let trigger = json!({
        "user_id": "trial-user",
        "license_key_id": 3,
        "trigger_type": "license_assigned",
    });
    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/onboarding/automation/trigger",
        &admin_token(),
        trigger,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json!({ "license_key": "LYC-TRL-2024-SAMPLE03", "requested_plugin": "klippel_qc" });
    let response = post_json_auth(app, VALIDATE, &user_token("trial-user"), body).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["valid"], true);
    assert_eq!(json["license_type"], "trial");
    assert_eq!(json["restrictions"]["time_limited"], true);
    let warnings = json["warnings"].as_array().unwrap();
    assert!(
        warnings.iter().any(|w| w.as_str().unwrap().starts_with("3 sessions remain")),
        "expected an onboarding warning, got {warnings:?}"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn trial_past_deadline_is_onboarding_incomplete(pool: PgPool) {
    sqlx::query(
        "INSERT INTO onboarding_progress \
         (user_id, license_id, total_sessions_required, sessions_completed, overall_status, onboarding_deadline) \
         VALUES ('late-user', 3, 3, 1, 'in_progress', NOW() - INTERVAL '2 days')",
    )
    .execute(&pool)
    .await
    .unwrap();
    let app = common::build_test_app(pool);
    let body = json!({ "license_key": "LYC-TRL-2024-SAMPLE03" });
    let response = post_json_auth(app, VALIDATE, &user_token("late-user"), body).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["reason"], "onboarding_incomplete");
    assert_eq!(json["onboarding_status"]["sessions_completed"], 1);
    assert!(!json["onboarding_status"]["next_steps"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Usage quotas
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn user_limit_counts_active_assignments(pool: PgPool) {
    sqlx::query(
        "UPDATE licenses SET max_users = 2 WHERE license_key = 'LYC-ENT-2024-SAMPLE01'",
    )
    .execute(&pool)
    .await
    .unwrap();
    for user in ["a", "b"] {
        sqlx::query("INSERT INTO license_assignments (license_id, user_id) VALUES (1, $1)")
            .bind(user)
            .execute(&pool)
            .await
            .unwrap();
    }
    let app = common::build_test_app(pool);
    let body = json!({ "license_key": "LYC-ENT-2024-SAMPLE01" });
    let response = post_json_auth(app, VALIDATE, &user_token("a"), body).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["reason"], "user_limit_exceeded");
    assert_eq!(json["current_usage"]["users_count"], 2);
    assert_eq!(json["limits"]["max_users"], 2);
}

// ---------------------------------------------------------------------------
// Failure paths (in-memory stores)
// ---------------------------------------------------------------------------

fn fail_open() -> GateConfig {
    GateConfig {
        fail_open: true,
        lookup_timeout: Duration::from_millis(50),
    }
}

#[tokio::test]
async fn usage_outage_is_503() {
    let memory = MemoryStores::new();
    memory.licenses.insert(license(1, "LYC-STD-1", LicenseType::Standard));
    memory.usage.set_unavailable(true);

    let app = common::build_memory_app(&memory, fail_open());
    let response = post_json_auth(app, VALIDATE, &user_token("u"), json!({ "license_key": "LYC-STD-1" })).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["reason"], "usage_check_failed");
}

#[tokio::test]
async fn license_store_outage_is_validation_error() {
    let memory = MemoryStores::new();
    memory.licenses.set_unavailable(true);

    let app = common::build_memory_app(&memory, fail_open());
    let response = post_json_auth(app, VALIDATE, &user_token("u"), json!({ "license_key": "LYC-STD-1" })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["valid"], false);
    assert_eq!(json["reason"], "validation_error");
}

#[tokio::test]
async fn slow_onboarding_store_fails_open_with_warning() {
    let memory = MemoryStores::new();
    memory.licenses.insert(license(1, "LYC-TRL-1", LicenseType::Trial));
    memory.onboarding.set_latency(Some(Duration::from_millis(500)));
    memory.usage.set(1, UsageCounts::default());

    let app = common::build_memory_app(&memory, fail_open());
    let response = post_json_auth(app, VALIDATE, &user_token("u"), json!({ "license_key": "LYC-TRL-1" })).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["warnings"][0], "Unable to verify onboarding status");
}

#[tokio::test]
async fn onboarding_outage_fails_closed_when_configured() {
    let memory = MemoryStores::new();
    memory.licenses.insert(license(1, "LYC-TRL-1", LicenseType::Trial));
    memory.onboarding.set_unavailable(true);

    let gate = GateConfig {
        fail_open: false,
        lookup_timeout: Duration::from_millis(50),
    };
    let app = common::build_memory_app(&memory, gate);
    let response = post_json_auth(app, VALIDATE, &user_token("u"), json!({ "license_key": "LYC-TRL-1" })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["reason"], "validation_error");
}
