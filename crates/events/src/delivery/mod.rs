//! External delivery channels for onboarding reminders.

pub mod webhook;
