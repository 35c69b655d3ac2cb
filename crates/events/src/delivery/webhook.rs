//! Webhook delivery with exponential-backoff retry.
//!
//! [`WebhookNotifier`] sends a JSON-encoded reminder to an external URL via
//! HTTP POST. Transport errors and 5xx responses are retried with exponential
//! backoff (1 s, 2 s, 4 s); a 4xx response fails the delivery at once.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use lyc_core::onboarding::OnboardingReminder;
use lyc_core::reminders::{NotifyError, ReminderNotifier};
use lyc_core::types::{DbId, Timestamp};

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

impl WebhookError {
    /// Whether another attempt could succeed. Client errors are final.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, WebhookError::HttpStatus(code) if (400..500).contains(code))
    }
}

impl From<WebhookError> for NotifyError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::HttpStatus(code) if (400..500).contains(&code) => {
                NotifyError::Rejected(err.to_string())
            }
            other => NotifyError::Transport(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Body posted to the webhook endpoint.
#[derive(Debug, Serialize)]
struct ReminderPayload<'a> {
    event_type: &'static str,
    reminder_id: DbId,
    user_id: &'a str,
    license_id: DbId,
    session_id: Option<DbId>,
    reminder_type: &'a str,
    message: &'a str,
    scheduled_for: Timestamp,
}

impl<'a> From<&'a OnboardingReminder> for ReminderPayload<'a> {
    fn from(r: &'a OnboardingReminder) -> Self {
        Self {
            event_type: "onboarding.reminder",
            reminder_id: r.id,
            user_id: &r.user_id,
            license_id: r.license_id,
            session_id: r.session_id,
            reminder_type: &r.reminder_type,
            message: &r.message,
            scheduled_for: r.scheduled_for,
        }
    }
}

// ---------------------------------------------------------------------------
// WebhookNotifier
// ---------------------------------------------------------------------------

/// Delivers onboarding reminders to a single webhook endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    retry_delays: Vec<Duration>,
}

impl WebhookNotifier {
    /// Create a notifier for `url` with a pre-configured HTTP client.
    pub fn new(url: impl Into<String>) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
            retry_delays: RETRY_DELAYS_SECS.iter().map(|s| Duration::from_secs(*s)).collect(),
        })
    }

    /// Replace the backoff schedule. An empty schedule means a single attempt.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver a reminder with retry.
    ///
    /// Returns `Ok(())` on the first successful attempt.
    pub async fn deliver(&self, reminder: &OnboardingReminder) -> Result<(), WebhookError> {
        let payload = ReminderPayload::from(reminder);

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(&payload).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_retryable() => {
                    tracing::error!(
                        url = %self.url,
                        reminder_id = reminder.id,
                        error = %e,
                        "Webhook rejected delivery"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url = %self.url,
                        reminder_id = reminder.id,
                        error = %e,
                        "Webhook delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        // Final attempt after the last backoff.
        self.try_send(&payload).await.map_err(|e| {
            tracing::error!(
                url = %self.url,
                reminder_id = reminder.id,
                error = %e,
                "Webhook delivery failed after all retries"
            );
            e
        })
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, payload: &ReminderPayload<'_>) -> Result<(), WebhookError> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl ReminderNotifier for WebhookNotifier {
    async fn notify(&self, reminder: &OnboardingReminder) -> Result<(), NotifyError> {
        self.deliver(reminder).await.map_err(NotifyError::from)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
