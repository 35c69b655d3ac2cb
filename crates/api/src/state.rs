use std::sync::Arc;

use lyc_core::automation::OnboardingAutomation;
use lyc_core::reminders::{ReminderDispatcher, ReminderNotifier};
use lyc_core::store::Stores;
use lyc_core::validation::orchestrator::LicenseValidator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (health checks).
    pub pool: lyc_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Store handles shared by the engine components.
    pub stores: Stores,
    /// License validation engine.
    pub validator: Arc<LicenseValidator>,
    /// Onboarding session scheduler and completion tracker.
    pub automation: Arc<OnboardingAutomation>,
    /// Reminder dispatcher. `None` when no notifier is configured.
    pub reminders: Option<Arc<ReminderDispatcher>>,
}

impl AppState {
    /// Wire the engine components onto a set of stores.
    pub fn new(
        pool: lyc_db::DbPool,
        config: Arc<ServerConfig>,
        stores: Stores,
        notifier: Option<Arc<dyn ReminderNotifier>>,
    ) -> Self {
        let validator = LicenseValidator::shared(stores.clone(), config.onboarding);
        let automation = Arc::new(OnboardingAutomation::new(
            stores.licenses.clone(),
            stores.onboarding.clone(),
        ));
        let reminders = notifier
            .map(|notifier| Arc::new(ReminderDispatcher::new(stores.onboarding.clone(), notifier)));

        Self {
            pool,
            config,
            stores,
            validator,
            automation,
            reminders,
        }
    }
}
