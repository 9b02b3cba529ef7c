mod api;
mod auth;
mod config;
mod dto;
mod error;
mod state;

use std::sync::Arc;

use tollgate_core::{AccessGate, CredentialStore, RateLimiterRegistry};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tollgate_web=debug,tollgate_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load()?;
    let bind_addr = config.bind_addr;

    // A bad credentials file at startup is fatal.
    let credentials = CredentialStore::open(&config.credentials_path, &config.watch)?;
    let limiter = Arc::new(RateLimiterRegistry::from_settings(&config.rate_limit));
    tracing::info!(
        requests_per_window = config.rate_limit.requests_per_window,
        window_secs = config.rate_limit.window_secs,
        "Per-tenant rate limit configured"
    );

    // Idle bucket eviction
    let sweeper = limiter.spawn_sweeper(config.rate_limit.sweep_interval());

    #[cfg(unix)]
    spawn_reload_on_hangup(credentials.clone());

    let max_body = config.max_body_size_mb * 1024 * 1024;
    let state = AppState {
        config: Arc::new(config),
        gate: AccessGate::new(credentials.clone(), limiter),
    };

    let app = api::app(state)
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("tollgate listening on http://{}", bind_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    credentials.close()?;
    tracing::info!("tollgate stopped");

    Ok(())
}

/// Reloads the credentials file on SIGHUP.
#[cfg(unix)]
fn spawn_reload_on_hangup(credentials: Arc<CredentialStore>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("SIGHUP handler unavailable: {e}");
                return;
            }
        };
        while hangup.recv().await.is_some() {
            tracing::info!("SIGHUP received, reloading credentials");
            let store = credentials.clone();
            // Failures are logged by the store; the previous credentials stay live.
            let _ = tokio::task::spawn_blocking(move || store.reload()).await;
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl-C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
