//! Solaris API Server
//!
//! Main entry point for the ledger backend. Runs on PostgreSQL when
//! `database.url` is configured and on the in-memory store otherwise.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use solaris_api::{AppState, create_router};
use solaris_core::events::{DispatcherSettings, EventDispatcher};
use solaris_core::ledger::LedgerCalendar;
use solaris_core::metrics::MetricsCache;
use solaris_core::store::{LedgerStore, MemoryStore};
use solaris_db::{PgLedgerStore, connect_pool};
use solaris_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    let fmt_layer = if config.logging.json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "solaris=debug,tower_http=debug".into()))
        .with(fmt_layer)
        .init();

    let calendar = LedgerCalendar::from_name(&config.ledger.timezone)?;
    info!(timezone = %config.ledger.timezone, "Ledger calendar configured");

    match config.database.url.clone() {
        Some(url) => {
            let db = connect_pool(&url, config.database.max_connections, config.database.min_connections).await?;
            info!("Connected to database");
            serve(PgLedgerStore::new(db), &config, calendar).await
        }
        None => {
            warn!("database.url not set, running on the in-memory store");
            serve(MemoryStore::new(), &config, calendar).await
        }
    }
}

async fn serve<S: LedgerStore>(store: S, config: &AppConfig, calendar: LedgerCalendar) -> anyhow::Result<()> {
    let jwt_config = JwtConfig {
        secret: config.jwt.secret.clone(),
        #[allow(clippy::cast_possible_wrap)]
        access_token_expires_minutes: (config.jwt.access_token_expiry_secs / 60) as i64,
    };
    let jwt_service = JwtService::new(jwt_config);

    let cache = MetricsCache::from_config(&config.metrics_cache);

    let dispatcher = EventDispatcher::standard(
        store.clone(),
        calendar,
        DispatcherSettings::from(&config.dispatcher),
    )
    .with_cache(cache.clone());
    let waker = dispatcher.waker();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let dispatcher_task = tokio::spawn(dispatcher.run(async move {
        let _ = stop_rx.await;
    }));

    let state = AppState::new(store, Arc::new(jwt_service), cache, calendar).with_dispatcher(waker);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = stop_tx.send(());
    dispatcher_task.await?;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
