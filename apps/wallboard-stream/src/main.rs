//! Wallboard Stream Binary
//!
//! Starts the market snapshot API and WebSocket broadcaster.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin wallboard-stream
//! ```
//!
//! # Environment Variables
//!
//! - `WALLBOARD_DATA_MODE`: demo | null (default: demo)
//! - `WALLBOARD_HTTP_PORT`: HTTP and WebSocket port (default: 8000)
//! - `WALLBOARD_REFRESH_INTERVAL_SECS`: Broadcast interval (default: 15)
//! - `WALLBOARD_ERROR_BACKOFF_SECS`: Delay after a failed build (default: 5)
//! - `WALLBOARD_SNAPSHOT_CACHE_TTL_SECS`: Category freshness, <= 0 disables (default: 10)
//! - `WALLBOARD_IDLE_TIMEOUT_SECS`: Idle window before a liveness probe (default: 30)
//! - `WALLBOARD_SUBSCRIBER_QUEUE_CAPACITY`: Outbound queue per connection (default: 32)
//! - `WALLBOARD_CACHE_BACKEND`: none | memory | redis (default: none)
//! - `REDIS_URL`: Redis endpoint (default: <redis://127.0.0.1:6379>)
//! - `WALLBOARD_MARKET_UTC_OFFSET_MINUTES`: Exchange offset (default: 480)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use wallboard_stream::infrastructure::cache::{InMemoryCacheStore, RedisCacheStore};
use wallboard_stream::infrastructure::config::CacheSettings;
use wallboard_stream::infrastructure::providers::{DemoProvider, NullProvider};
use wallboard_stream::infrastructure::telemetry;
use wallboard_stream::{
    ApiServer, ApiState, CacheBackend, CacheStore, CategoryFetcher, DataMode, FreshnessCache,
    MarketDataProvider, MarketHours, SnapshotAggregator, SnapshotService, SnapshotSource,
    StreamConfig, SubscriberRegistry, init_metrics,
};

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Wallboard Stream");

    let _metrics_handle = init_metrics();

    let config = StreamConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let provider: Arc<dyn MarketDataProvider> = match config.data_mode {
        DataMode::Demo => Arc::new(DemoProvider),
        DataMode::Null => Arc::new(NullProvider),
    };
    let provider_name = provider.name();

    let store = connect_cache_store(&config.cache).await;
    let cache = Arc::new(FreshnessCache::new(
        CategoryFetcher::new(provider),
        store,
        config.cache.ttl(),
    ));
    let source: Arc<dyn SnapshotSource> = Arc::new(SnapshotAggregator::new(
        cache,
        MarketHours::mainland(config.market.utc_offset_minutes),
    ));

    let registry = SubscriberRegistry::new(
        Arc::clone(&source),
        config.broadcast,
        shutdown_token.clone(),
    );
    let service = SnapshotService::new(source, registry);

    let state = Arc::new(ApiState::new(
        env!("CARGO_PKG_VERSION"),
        service.clone(),
        provider_name,
        config.connection,
        shutdown_token.clone(),
    ));
    let server = ApiServer::new(config.server.http_port, state, shutdown_token.clone());

    let server_shutdown = shutdown_token.clone();
    let server_task = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "API server error");
            server_shutdown.cancel();
        }
    });

    tracing::info!("Wallboard stream ready");

    await_shutdown(shutdown_token).await;

    service.shutdown().await;
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, server_task).await.is_err() {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "API server did not stop in time"
        );
    }

    tracing::info!("Wallboard stream stopped");
    Ok(())
}

/// Open the configured shared cache store. A Redis connection failure
/// leaves the service running on in-process freshness records only.
async fn connect_cache_store(settings: &CacheSettings) -> Option<Arc<dyn CacheStore>> {
    match settings.backend {
        CacheBackend::None => None,
        CacheBackend::Memory => Some(Arc::new(InMemoryCacheStore::new())),
        CacheBackend::Redis => match RedisCacheStore::connect(&settings.redis_url).await {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, continuing without shared cache");
                None
            }
        },
    }
}

/// Log the parsed configuration.
fn log_config(config: &StreamConfig) {
    tracing::info!(
        data_mode = config.data_mode.as_str(),
        http_port = config.server.http_port,
        refresh_interval_secs = config.broadcast.interval.as_secs(),
        cache_backend = config.cache.backend.as_str(),
        cache_ttl_secs = config.cache.snapshot_ttl_secs,
        "Configuration loaded"
    );
    tracing::debug!(
        error_backoff_secs = config.broadcast.error_backoff.as_secs(),
        idle_timeout_secs = config.connection.session.idle_timeout.as_secs(),
        queue_capacity = config.connection.queue_capacity,
        utc_offset_minutes = config.market.utc_offset_minutes,
        "Connection settings"
    );
}

/// Load .env from the current directory or the nearest ancestor that has one.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let env_path = cwd
            .ancestors()
            .skip(1)
            .map(|dir| dir.join(".env"))
            .find(|path| path.exists());
        if let Some(env_path) = env_path {
            let _ = dotenvy::from_path(&env_path);
        }
    }
}

/// Wait for SIGINT, SIGTERM, or an internal cancellation.
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown_token.cancelled() => {
            tracing::info!("Internal shutdown requested");
        }
    }

    shutdown_token.cancel();
}
