//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations of the application ports plus the HTTP and
//! WebSocket transport.

/// Persistent cache store adapters (in-memory, Redis).
pub mod cache;

/// Configuration loaded from the environment.
pub mod config;

/// HTTP server: snapshot routes, WebSocket upgrade, health and metrics.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Market data provider adapters.
pub mod providers;

/// OpenTelemetry tracing integration.
pub mod telemetry;

/// WebSocket subscriber sink and connection handling.
pub mod websocket;
