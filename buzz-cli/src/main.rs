use buzz::notifications::{NotificationPoller, NotificationStore};
use buzz::resources::{ConnectedPlatforms, UserResource};
use buzz::session::{token_expired, FileSessionRepository};
use buzz::{new_cache, Backend, DashboardAggregator, QueryClient, SessionRepository};
use buzz_client::ApiClient;
use chrono::Utc;
use shared::config::Config;
use shared::{Error, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env first so RUST_LOG can come from it
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match dotenv {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    info!("Using BuzzConnect API at {}", config.api_base_url);

    let session = Arc::new(FileSessionRepository::open(&config.data_dir).await?);
    if let Some(token) = session.token().await {
        if token_expired(&token, Utc::now()) {
            warn!("Stored session has expired, clearing it");
            session.clear().await?;
        }
    }
    if let Some(token) = &config.api_token {
        session.set_token(Some(token.clone())).await?;
    }

    let backend: Arc<dyn Backend> = Arc::new(ApiClient::new(&config, session.clone())?);
    let queries = QueryClient::new(new_cache(config.cache_ttl));

    if let Err(e) = backend.health().await {
        warn!("Health check failed: {}", e);
    }

    let user = UserResource::new(backend.clone(), queries.clone(), session.clone());
    if user.restore().await.is_none() && !user.is_authenticated().await {
        match (&config.email, &config.password) {
            (Some(email), Some(password)) => {
                user.login(email, password).await?;
            }
            _ => {
                return Err(Error::Unauthorized(
                    "No session found. Set BUZZ_API_TOKEN or BUZZ_EMAIL and BUZZ_PASSWORD.".to_string(),
                ))
            }
        }
    }

    let dashboard =
        DashboardAggregator::new(backend.clone(), queries.clone()).with_window(config.dashboard_ttl);
    let view = dashboard.fetch_dashboard().await?;
    for failure in view.failures() {
        warn!("{} unavailable", failure.source);
    }

    match ConnectedPlatforms::new(backend.clone(), queries.clone()).connected().await {
        Ok(platforms) if platforms.is_empty() => info!("No platforms connected"),
        Ok(platforms) => {
            let names: Vec<&str> = platforms.iter().map(|p| p.config.name).collect();
            info!("Connected platforms: {}", names.join(", "));
        }
        Err(e) => warn!("Could not read connected platforms: {}", e),
    }

    let json = serde_json::to_string_pretty(&view)
        .map_err(|e| Error::Internal(format!("failed to render dashboard: {}", e)))?;
    println!("{}", json);

    if config.watch_notifications {
        watch_notifications(backend, session, &config).await;
    }
    Ok(())
}

async fn watch_notifications(
    backend: Arc<dyn Backend>,
    session: Arc<dyn SessionRepository>,
    config: &Config,
) {
    let store = Arc::new(NotificationStore::new(backend));
    let poller = NotificationPoller::new(store.clone(), session, config.notification_poll_interval);
    let cancel = poller.cancel_token();
    let handle = poller.spawn();

    shutdown_signal().await;
    cancel.cancel();
    store.shutdown();
    if let Err(e) = handle.await {
        warn!("Notification poller ended abnormally: {}", e);
    }
    info!("{} unread notification(s)", store.unread_count());
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down...");
}
