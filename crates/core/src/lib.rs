//! Licensing domain core.
//!
//! Entitlement validation, onboarding progress, onboarding automation and
//! reminder dispatch. The crate has no database dependencies; persistence
//! sits behind the traits in [`store`], with Postgres adapters in `lyc-db`
//! and in-memory adapters in [`memory`].

#[macro_use]
mod macros;

pub mod automation;
pub mod error;
pub mod license;
pub mod memory;
pub mod onboarding;
pub mod reminders;
pub mod roles;
pub mod store;
pub mod types;
pub mod validation;
