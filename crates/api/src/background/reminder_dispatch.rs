//! Periodic delivery of due onboarding reminders.
//!
//! Scans for pending reminders whose `scheduled_for` has passed and hands
//! them to the [`ReminderDispatcher`] on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lyc_core::reminders::ReminderDispatcher;
use tokio_util::sync::CancellationToken;

/// Run the reminder dispatch loop until `cancel` is triggered.
///
/// The first scan runs immediately.
pub async fn run(dispatcher: Arc<ReminderDispatcher>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Reminder dispatch job started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reminder dispatch job stopping");
                break;
            }
            _ = interval.tick() => {
                match dispatcher.dispatch_due(Utc::now()).await {
                    Ok(report) if report.summary.total == 0 => {
                        tracing::debug!("Reminder dispatch: nothing due");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Reminder dispatch: scan failed");
                    }
                }
            }
        }
    }
}
