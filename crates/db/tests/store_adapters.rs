//! Integration tests for the Postgres store adapters.
//!
//! Exercises the `lyc-core` store traits against a real database seeded by
//! the migrations.

use std::collections::BTreeMap;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use sqlx::PgPool;

use lyc_core::automation::{NewAutomationLogEntry, TriggerType};
use lyc_core::error::StoreError;
use lyc_core::license::{AccessLevel, DerivedLicenseFields, LicenseType, TimeLimitType};
use lyc_core::onboarding::{
    NewOnboardingReminder, NewOnboardingSession, ProgressDraft, ProgressStatus, ReminderStatus,
    SessionStatus,
};
use lyc_core::store::{LicenseStore, OnboardingStore, UsageStore};
use lyc_db::{PgLicenseStore, PgOnboardingStore, PgUsageStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn license_id(pool: &PgPool, key: &str) -> i64 {
    let (id,): (i64,) = sqlx::query_as("SELECT id FROM licenses WHERE license_key = $1")
        .bind(key)
        .fetch_one(pool)
        .await
        .unwrap();
    id
}

fn draft(user_id: &str, license_id: i64) -> ProgressDraft {
    let now = Utc::now();
    ProgressDraft {
        user_id: user_id.to_string(),
        license_id,
        total_sessions_required: 3,
        plugin_sessions_required: BTreeMap::from([("klippel_qc".to_string(), 2)]),
        sessions_completed: 0,
        overall_status: ProgressStatus::Pending,
        onboarding_deadline: Some(now + Duration::days(20)),
        license_active_status: true,
        started_at: now,
        completed_at: None,
    }
}

fn session(user_id: &str, license_id: i64, number: i32) -> NewOnboardingSession {
    NewOnboardingSession {
        user_id: user_id.to_string(),
        license_id,
        template_id: None,
        plugin_id: "klippel_qc".to_string(),
        session_type: "walkthrough".to_string(),
        session_number: number,
        title: format!("Session {number}"),
        description: None,
        status: SessionStatus::Scheduled,
        scheduled_at: Some(Utc::now() + Duration::days(i64::from(number))),
    }
}

// ---------------------------------------------------------------------------
// Licenses
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn seeded_license_loads_with_typed_fields(pool: PgPool) {
    let store = PgLicenseStore::new(pool);
    let license = store
        .find_by_key("LYC-ENT-2024-SAMPLE01")
        .await
        .unwrap()
        .expect("seeded license");

    assert_eq!(license.license_type, LicenseType::Enterprise);
    assert_eq!(license.access_level, AccessLevel::Full);
    assert!(license.enabled_plugins.contains("klippel_qc"));
    assert!(license.enabled_plugins.contains("apx500"));
    assert!(license.plugin_permissions.is_empty());
    assert_eq!(license.max_users, None);

    assert!(store.find_by_key("LYC-MISSING").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_plugin_permissions_are_rejected_at_the_boundary(pool: PgPool) {
    sqlx::query(
        "UPDATE licenses SET plugin_permissions = '{\"klippel_qc\": {\"can_fly\": true}}' \
         WHERE license_key = 'LYC-ENT-2024-SAMPLE01'",
    )
    .execute(&pool)
    .await
    .unwrap();

    let store = PgLicenseStore::new(pool);
    let result = store.find_by_key("LYC-ENT-2024-SAMPLE01").await;
    assert_matches!(result, Err(StoreError::Malformed(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unset_access_level_reads_as_tier_default(pool: PgPool) {
    sqlx::query(
        "INSERT INTO licenses (license_key, license_type) VALUES ('LYC-PRO-NOLEVEL', 'professional')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let store = PgLicenseStore::new(pool);
    let license = store.find_by_key("LYC-PRO-NOLEVEL").await.unwrap().unwrap();
    assert_eq!(license.access_level, AccessLevel::Advanced);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn custom_trial_days_are_bounded_by_the_schema(pool: PgPool) {
    let result = sqlx::query(
        "INSERT INTO licenses (license_key, license_type, time_limit_type, custom_trial_days) \
         VALUES ('LYC-TRIAL-HUGE', 'trial', 'trial_custom', 2147483647)",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn derived_fields_are_written_back(pool: PgPool) {
    let id = license_id(&pool, "LYC-PRO-2024-SAMPLE02").await;
    let store = PgLicenseStore::new(pool);

    let fields = DerivedLicenseFields {
        enabled_plugins: ["advanced_analytics", "klippel_qc"].iter().map(|s| s.to_string()).collect(),
        access_level: AccessLevel::Advanced,
        time_limit_type: TimeLimitType::TrialCustom,
        custom_trial_days: Some(45),
    };
    let updated = store.update_derived_fields(id, &fields).await.unwrap().unwrap();
    assert!(updated.enabled_plugins.contains("klippel_qc"));
    assert_eq!(updated.time_limit_type, TimeLimitType::TrialCustom);
    assert_eq!(updated.custom_trial_days, Some(45));

    assert!(store.update_derived_fields(999_999, &fields).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn usage_counts_only_live_records(pool: PgPool) {
    let id = license_id(&pool, "LYC-ENT-2024-SAMPLE01").await;

    sqlx::query(
        "INSERT INTO license_assignments (license_id, user_id, revoked_at) VALUES \
         ($1, 'u1', NULL), ($1, 'u2', NULL), ($1, 'u3', NOW())",
    )
    .bind(id)
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO license_projects (license_id, name, archived_at) VALUES \
         ($1, 'live', NULL), ($1, 'old', NOW())",
    )
    .bind(id)
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO license_storage_objects (license_id, object_key, size_bytes, deleted_at) VALUES \
         ($1, 'a', 1073741824, NULL), ($1, 'b', 536870912, NULL), ($1, 'c', 1073741824, NOW())",
    )
    .bind(id)
    .execute(&pool)
    .await
    .unwrap();

    let usage = PgUsageStore::new(pool).current_usage(id).await.unwrap();
    assert_eq!(usage.users_count, 2);
    assert_eq!(usage.projects_count, 1);
    assert!((usage.storage_used_gb - 1.5).abs() < 1e-9);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn usage_for_unused_license_is_zero(pool: PgPool) {
    let id = license_id(&pool, "LYC-PRO-2024-SAMPLE02").await;
    let usage = PgUsageStore::new(pool).current_usage(id).await.unwrap();
    assert_eq!(usage.users_count, 0);
    assert_eq!(usage.projects_count, 0);
    assert_eq!(usage.storage_used_gb, 0.0);
}

// ---------------------------------------------------------------------------
// Onboarding
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn progress_insert_update_and_unique_pair(pool: PgPool) {
    let id = license_id(&pool, "LYC-TRL-2024-SAMPLE03").await;
    let store = PgOnboardingStore::new(pool);

    let created = store.insert_progress(&draft("user-1", id)).await.unwrap();
    assert_eq!(created.plugin_sessions_required.get("klippel_qc"), Some(&2));
    assert!(!store.has_completed_onboarding("user-1").await.unwrap());

    // Second insert for the same pair violates the unique constraint.
    let duplicate = store.insert_progress(&draft("user-1", id)).await;
    assert_matches!(duplicate, Err(StoreError::Unavailable(msg)) if msg.contains("uq_onboarding_progress_user_license"));

    let mut update = draft("user-1", id);
    update.sessions_completed = 3;
    update.overall_status = ProgressStatus::Completed;
    update.completed_at = Some(Utc::now());
    let updated = store.update_progress(created.id, &update).await.unwrap();
    assert_eq!(updated.overall_status, ProgressStatus::Completed);
    assert_eq!(updated.created_at, created.created_at);
    assert!(store.has_completed_onboarding("user-1").await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sessions_listed_in_number_order_and_completed(pool: PgPool) {
    let id = license_id(&pool, "LYC-TRL-2024-SAMPLE03").await;
    let store = PgOnboardingStore::new(pool);

    let second = store.create_session(&session("user-1", id, 2)).await.unwrap();
    let first = store.create_session(&session("user-1", id, 1)).await.unwrap();
    store.create_session(&session("user-2", id, 1)).await.unwrap();

    let listed = store.list_sessions("user-1", id).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    let now = Utc::now();
    let completed = store.complete_session(first.id, now).await.unwrap().unwrap();
    assert_eq!(completed.status, SessionStatus::Completed);
    assert!(completed.completed_at.is_some());
    assert!(store.complete_session(999_999, now).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn seeded_templates_parse_in_priority_order(pool: PgPool) {
    let store = PgOnboardingStore::new(pool);
    let templates = store.list_active_templates().await.unwrap();
    assert_eq!(templates.len(), 4);
    assert!(templates.windows(2).all(|w| w[0].priority_order <= w[1].priority_order));
    assert!(templates[0].license_types.contains(&LicenseType::Trial));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn due_reminders_and_status_transitions(pool: PgPool) {
    let id = license_id(&pool, "LYC-TRL-2024-SAMPLE03").await;
    let store = PgOnboardingStore::new(pool);
    let now = Utc::now();

    let reminder = |offset_hours: i64| NewOnboardingReminder {
        user_id: "user-1".to_string(),
        license_id: id,
        session_id: None,
        reminder_type: "session_upcoming".to_string(),
        message: "Session tomorrow".to_string(),
        scheduled_for: now + Duration::hours(offset_hours),
    };

    let due = store.create_reminder(&reminder(-2)).await.unwrap();
    let also_due = store.create_reminder(&reminder(-1)).await.unwrap();
    store.create_reminder(&reminder(5)).await.unwrap();

    let listed = store.list_due_reminders(now).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![due.id, also_due.id]);

    assert!(store.mark_reminder_sent(due.id, now).await.unwrap());
    assert!(store.mark_reminder_failed(also_due.id, "smtp down").await.unwrap());

    let sent = store.find_reminder(due.id).await.unwrap().unwrap();
    assert_eq!(sent.status, ReminderStatus::Sent);
    let failed = store.find_reminder(also_due.id).await.unwrap().unwrap();
    assert_eq!(failed.status, ReminderStatus::Failed);
    assert_eq!(failed.last_error.as_deref(), Some("smtp down"));
    assert!(store.list_due_reminders(now).await.unwrap().is_empty());

    // Settled reminders do not move again.
    assert!(!store.mark_reminder_failed(due.id, "late failure").await.unwrap());
    assert!(!store.mark_reminder_sent(also_due.id, now).await.unwrap());
    assert!(!store.mark_reminder_sent(999_999, now).await.unwrap());
    let sent = store.find_reminder(due.id).await.unwrap().unwrap();
    assert_eq!(sent.status, ReminderStatus::Sent);
    assert_eq!(sent.last_error, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn automation_log_round_trips_arrays_and_filters(pool: PgPool) {
    let store = PgOnboardingStore::new(pool);
    let entry = |user: &str| NewAutomationLogEntry {
        user_id: user.to_string(),
        license_id: 3,
        trigger_type: TriggerType::Manual,
        triggered_by: Some("admin-7".to_string()),
        sessions_created: 2,
        templates_used: vec![1, 3],
        errors: vec!["template 2: boom".to_string()],
        skipped_reason: None,
    };

    store.record_automation(&entry("user-1")).await.unwrap();
    store.record_automation(&entry("user-2")).await.unwrap();

    let all = store.list_automation_logs(None, 10, 0).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].user_id, "user-2");

    let filtered = store.list_automation_logs(Some("user-1"), 10, 0).await.unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].templates_used, vec![1, 3]);
    assert_eq!(filtered[0].trigger_type, TriggerType::Manual);

    let paged = store.list_automation_logs(None, 1, 1).await.unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].user_id, "user-1");
}
