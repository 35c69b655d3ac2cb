//! Outbound reminder delivery.
//!
//! - [`delivery`] -- external delivery channels for onboarding reminders.
//! - [`WebhookNotifier`] -- posts reminders to a configured HTTP endpoint,
//!   implementing `lyc_core::reminders::ReminderNotifier`.

pub mod delivery;

pub use delivery::webhook::{WebhookError, WebhookNotifier};
