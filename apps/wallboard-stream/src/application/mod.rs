//! Application Layer - Ports and services.
//!
//! Ports describe the collaborators the engine depends on; services
//! implement the cache, aggregation and broadcast use cases against them.

/// Port interfaces for providers, cache stores, sinks and snapshot sources.
pub mod ports;

/// Fetcher, freshness cache, aggregator, registry, sessions and facade.
pub mod services;
