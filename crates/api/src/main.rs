use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lyc_core::reminders::ReminderNotifier;
use lyc_events::WebhookNotifier;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lyc_api::background;
use lyc_api::config::ServerConfig;
use lyc_api::router::build_app_router;
use lyc_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lyc_api=debug,lyc_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        onboarding_fail_open = config.onboarding.fail_open,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = lyc_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    lyc_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    lyc_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Reminder notifier ---
    let notifier: Option<Arc<dyn ReminderNotifier>> = match &config.reminder_webhook_url {
        Some(url) => {
            let webhook = WebhookNotifier::new(url.clone())
                .expect("Failed to build reminder webhook client");
            tracing::info!(url = %webhook.url(), "Reminder webhook configured");
            Some(Arc::new(webhook))
        }
        None => {
            tracing::warn!("REMINDER_WEBHOOK_URL not set, reminder delivery disabled");
            None
        }
    };

    // --- App state ---
    let stores = lyc_db::pg_stores(pool.clone());
    let state = AppState::new(pool, Arc::new(config.clone()), stores, notifier);

    // --- Background jobs ---
    let cancel = CancellationToken::new();
    let reminder_handle = state.reminders.clone().map(|dispatcher| {
        tokio::spawn(background::reminder_dispatch::run(
            dispatcher,
            Duration::from_secs(config.reminder_scan_interval_secs),
            cancel.clone(),
        ))
    });

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    if let Some(handle) = reminder_handle {
        let grace = Duration::from_secs(config.shutdown_timeout_secs);
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Reminder dispatch job did not stop within the shutdown timeout");
        } else {
            tracing::info!("Reminder dispatch job stopped");
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
