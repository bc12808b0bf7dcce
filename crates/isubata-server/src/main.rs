mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use isubata_api::feed::FeedConfig;
use isubata_api::icons::IconStore;
use isubata_api::routes::build_router;
use isubata_api::{AppState, AppStateInner};
use isubata_cache::{CacheBackend, MemoryCache, RedisCache};
use isubata_db::Database;
use isubata_db::models::ResetBaseline;

use crate::config::Config;

const DEFAULT_LOG_FILTER: &str =
    "isubata_server=debug,isubata_api=debug,isubata_cache=debug,isubata_db=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.jwt_secret == "dev-secret-change-me" {
        warn!("ISUBATA_JWT_SECRET is unset; using the development secret");
    }

    let db = Arc::new(Database::open(&config.db_path)?);

    let cache = match &config.redis_url {
        Some(url) => CacheBackend::Redis(RedisCache::connect(url)?),
        None => {
            info!("Recent-message cache: in process");
            CacheBackend::Memory(MemoryCache::new())
        }
    };

    let icons = IconStore::new(config.icons_dir.clone()).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        cache,
        icons,
        jwt_secret: config.jwt_secret.clone(),
        feed: FeedConfig {
            store_fallback: config.store_fallback,
            ..FeedConfig::default()
        },
        unread_delay: config.unread_delay,
        reset_baseline: ResetBaseline::default(),
    });

    let app = build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Isubata server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
