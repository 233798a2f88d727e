//! Meetup Service
//!
//! Entry point for the meetup participation backend.

use common::config::ObservabilityConfig;
use common::secret::ExposeSecret;
use meetup_service::config::{Config, DEFAULT_LOG_FILTER};
use meetup_service::observability::metrics::init_metrics_recorder;
use meetup_service::routes::{self, AppState};
use meetup_service::services::{LoggingNotificationSink, NotificationSink, WebhookNotificationSink};
use meetup_service::tasks::{start_notification_dispatcher, NotificationDispatcherConfig};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let vars: HashMap<String, String> = std::env::vars().collect();
    let observability = ObservabilityConfig::from_vars(&vars, DEFAULT_LOG_FILTER);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| observability.default_filter.clone().into()),
        )
        .with(
            observability
                .json_logs
                .then(|| tracing_subscriber::fmt::layer().json()),
        )
        .with(
            (!observability.json_logs).then(|| tracing_subscriber::fmt::layer()),
        )
        .init();

    info!("Starting Meetup Service");

    let config = Config::from_vars(&vars).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        calendar_offset = %config.calendar_offset,
        webhook_configured = config.notification_webhook_url.is_some(),
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    info!("Connecting to database...");
    let db_url_with_timeout = add_query_timeout(
        config.database.url.expose_secret(),
        config.database.statement_timeout_seconds,
    );
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&db_url_with_timeout)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    info!("Database connection established");

    let sink: Arc<dyn NotificationSink> = match &config.notification_webhook_url {
        Some(url) => Arc::new(WebhookNotificationSink::new(url.clone())?),
        None => {
            warn!("NOTIFICATION_WEBHOOK_URL not set, notifications will only be logged");
            Arc::new(LoggingNotificationSink)
        }
    };

    let cancel_token = CancellationToken::new();
    let dispatcher = tokio::spawn(start_notification_dispatcher(
        db_pool.clone(),
        sink,
        NotificationDispatcherConfig::from(&config),
        cancel_token.child_token(),
    ));

    let bind_address = config.bind_address.clone();

    let state = Arc::new(AppState {
        pool: db_pool,
        config,
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Meetup Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cancel_token.cancel();
    if let Err(e) = dispatcher.await {
        error!("Notification dispatcher task failed: {}", e);
    }

    info!("Meetup Service shutdown complete");

    Ok(())
}

/// Waits for SIGTERM or SIGINT, then for the drain period.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let drain_secs: u64 = std::env::var("MEETUP_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (MEETUP_DRAIN_SECONDS=0)");
    }
}

/// Appends `statement_timeout` to the database URL.
fn add_query_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}options=-c%20statement_timeout%3D{timeout_secs}s")
}
