//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument and return row models.

pub mod automation_log_repo;
pub mod license_repo;
pub mod onboarding_progress_repo;
pub mod onboarding_reminder_repo;
pub mod onboarding_session_repo;
pub mod onboarding_template_repo;
pub mod usage_repo;

pub use automation_log_repo::AutomationLogRepo;
pub use license_repo::LicenseRepo;
pub use onboarding_progress_repo::OnboardingProgressRepo;
pub use onboarding_reminder_repo::OnboardingReminderRepo;
pub use onboarding_session_repo::OnboardingSessionRepo;
pub use onboarding_template_repo::OnboardingTemplateRepo;
pub use usage_repo::UsageRepo;
