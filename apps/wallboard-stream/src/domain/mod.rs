//! Domain Layer - Market data and streaming types.
//!
//! This layer contains the value types shared by the cache, the
//! aggregator and the broadcast engine. Nothing here performs I/O.

/// Categories, quotes, payloads, snapshots and market hours.
pub mod market;

/// Client/server WebSocket protocol messages.
pub mod streaming;

/// Subscriber identity and registry occupancy transitions.
pub mod subscription;
