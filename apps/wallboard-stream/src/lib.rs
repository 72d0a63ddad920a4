#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::default_trait_access
    )
)]

//! Wallboard Stream - Market Snapshot Cache and Broadcast Engine
//!
//! Serves consolidated market snapshots (indices, FX, rates, commodities,
//! US stocks and an economic calendar) to wallboard displays, both on
//! request over HTTP and as a periodic push over WebSocket.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Market data types and the wire protocol
//!   - `market`: Categories, quotes, payloads, snapshots, market hours
//!   - `streaming`: Client/server messages and subscription scopes
//!   - `subscription`: Subscriber ids and loop transitions
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Provider, cache store, subscriber sink, snapshot source
//!   - `services`: Freshness cache, aggregator, registry, sessions, facade
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `providers`: Demo, null and fixture data sources
//!   - `cache`: In-memory and Redis stores
//!   - `websocket` / `http`: axum transport
//!   - `config`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//!                 ┌──────────────┐     ┌────────────┐     ┌────────────┐
//! Provider ──────►│  Freshness   │────►│ Aggregator │────►│  Registry  │──► Wallboard 1
//!                 │ Cache (x6)   │     └────────────┘     │ + Loop     │──► Wallboard 2
//! Cache Store ◄──►└──────────────┘           │            └────────────┘──► Wallboard N
//!                                            └──► GET /data/snapshot
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Market data types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::market::{
    Category, CategoryPayload, IndexDisplay, MarketHours, MarketStatus, MarketSummary, Quote,
    Snapshot,
};
pub use domain::streaming::{ClientMessage, ServerMessage, SubscriptionScope};
pub use domain::subscription::{RegistryStatus, SubscriberId};

// Ports
pub use application::ports::{
    CacheStore, MarketDataProvider, SendError, SnapshotError, SnapshotSource, SubscriberSink,
};

// Services
pub use application::services::{
    BroadcastLoopSettings, CacheTtl, CategoryFetcher, FreshnessCache, SessionSettings,
    SnapshotAggregator, SnapshotService, SubscriberRegistry,
};

// Infrastructure config
pub use infrastructure::config::{CacheBackend, ConfigError, DataMode, StreamConfig};

// HTTP server
pub use infrastructure::http::{ApiServer, ApiServerError, ApiState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
