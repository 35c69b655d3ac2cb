use std::time::Duration;

use lyc_core::onboarding::gate::GateConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background jobs get to stop after shutdown starts (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// Onboarding gate policy for trial licenses.
    pub onboarding: GateConfig,
    /// Reminder webhook endpoint. Reminder delivery is disabled when unset.
    pub reminder_webhook_url: Option<String>,
    /// Interval between due-reminder scans in seconds (default: `300`).
    pub reminder_scan_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `3000`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `30`                    |
    /// | `ONBOARDING_FAIL_OPEN`        | `true`                  |
    /// | `ONBOARDING_TIMEOUT_MS`       | `3000`                  |
    /// | `REMINDER_WEBHOOK_URL`        | unset                   |
    /// | `REMINDER_SCAN_INTERVAL_SECS` | `300`                   |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();

        let fail_open = parse_flag(
            "ONBOARDING_FAIL_OPEN",
            std::env::var("ONBOARDING_FAIL_OPEN").ok().as_deref(),
            true,
        );

        let lookup_timeout_ms: u64 = std::env::var("ONBOARDING_TIMEOUT_MS")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("ONBOARDING_TIMEOUT_MS must be a valid u64");

        let reminder_webhook_url = std::env::var("REMINDER_WEBHOOK_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let reminder_scan_interval_secs: u64 = std::env::var("REMINDER_SCAN_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("REMINDER_SCAN_INTERVAL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            onboarding: GateConfig {
                fail_open,
                lookup_timeout: Duration::from_millis(lookup_timeout_ms),
            },
            reminder_webhook_url,
            reminder_scan_interval_secs,
        }
    }
}

/// Parse a boolean env value. Accepts `true/false`, `1/0`, `yes/no`.
///
/// # Panics
///
/// Panics on any other value.
fn parse_flag(name: &str, value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => default,
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => panic!("{name} must be a boolean, got '{v}'"),
        },
    }
}
