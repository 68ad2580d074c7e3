mod api;
mod cache;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    cache::RecordCache,
    middleware::AuthState,
    scheduler::AutoRefresh,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = salesmap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting salesmap server");

    let source = salesmap_sheets::build_source(&config.source, config.request_timeout_secs)?;
    let cache = Arc::new(RecordCache::new(
        source,
        Duration::from_secs(config.cache_ttl_secs),
    ));

    // Warm the snapshot; an unreachable source is not fatal at startup.
    if let Err(e) = cache.current().await {
        tracing::warn!(error = %e, "initial record fetch failed; serving until the source recovers");
    }

    let auto_refresh = Arc::new(AutoRefresh::start(Arc::clone(&cache)).await?);
    if config.auto_refresh_secs > 0 {
        auto_refresh.enable(config.auto_refresh_secs).await?;
    }

    let auth = AuthState::from_password(
        config.dashboard_password.as_deref(),
        matches!(config.env, salesmap_core::Environment::Development),
    )?;
    let app = build_app(
        AppState {
            cache,
            auto_refresh,
            map: Arc::new(config.map),
            export_file_name: Arc::from(config.export_file_name.as_str()),
        },
        auth,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
