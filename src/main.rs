use std::sync::Arc;

use heliocache::provider::HorizonsProvider;
use heliocache::{cache, config, http, observability, SnapshotEngine};

#[tokio::main]
async fn main() {
    let config = config::Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info")),
        )
        .json()
        .init();

    let metrics_handle = observability::install_metrics_recorder();

    let primary = match &config.redis_url {
        Some(url) => cache::RedisStore::connect(url).await,
        None => None,
    };
    let store = Arc::new(cache::CacheStore::new(primary));
    let provider = Arc::new(HorizonsProvider::new());
    let engine = SnapshotEngine::new(provider, store, config.cache_ttl, config.cache_stale_window);

    if let Some(interval) = config.prewarm_interval {
        engine.start_prewarmer(interval);
    }

    let app = http::build_router(engine.clone(), metrics_handle);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));
    tracing::info!(addr, "server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| tracing::error!(error = %e, "server_error"));

    engine.shutdown();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .unwrap_or_else(|e| tracing::warn!(error = %e, "ctrl_c_handler_failed"));
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "sigterm_handler_failed");
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
    tracing::info!("shutdown_signal_received");
}
