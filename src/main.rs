use std::sync::Arc;
use std::time::Duration;

use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bailiff::app::moderation::ModerationService;
use bailiff::app::notifications::NotificationService;
use bailiff::config::AppConfig;
use bailiff::infra::{notifier::LogNotifier, storage::JsonFileStore};
use bailiff::jobs::expiry_sweeper;
use bailiff::{http, AppState};

const NOTIFICATION_DRAIN_SECONDS: u64 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let persistence = Arc::new(JsonFileStore::new(config.data_path.clone()));
    let (notifications, notification_worker) =
        NotificationService::spawn(Arc::new(LogNotifier), config.notify_queue_capacity);
    let moderation = ModerationService::load(persistence, notifications).await?;

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set, moderation routes will refuse every request");
    }

    let sweeper = tokio::spawn(expiry_sweeper::run(
        moderation.clone(),
        config.expiry_sweep_interval,
    ));

    let state = AppState {
        moderation,
        admin_token: config.admin_token.clone(),
    };

    let app = http::router(state).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!("listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The worker exits once the last service handle, and with it the queue sender, is gone.
    sweeper.abort();
    let _ = sweeper.await;
    let drain = Duration::from_secs(NOTIFICATION_DRAIN_SECONDS);
    if tokio::time::timeout(drain, notification_worker).await.is_err() {
        tracing::warn!("notification queue not drained before shutdown");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
