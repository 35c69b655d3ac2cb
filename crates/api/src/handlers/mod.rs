pub mod automation;
pub mod license_admin;
pub mod license_validation;
pub mod onboarding;
pub mod reminders;
