//! Port Interfaces
//!
//! ## Driven Ports (Outbound)
//!
//! - [`MarketDataProvider`]: upstream category data
//! - [`CacheStore`]: optional persistent key/value cache with TTL
//! - [`SubscriberSink`]: outbound half of a subscriber connection
//!
//! ## Internal Seams
//!
//! - [`SnapshotSource`]: anything that can build a snapshot (the
//!   aggregator in production, failing doubles in tests)

mod cache_store_port;
mod provider_port;
mod snapshot_port;
mod subscriber_port;

pub use cache_store_port::{CacheStore, CacheStoreError};
pub use provider_port::{MarketDataProvider, ProviderError};
pub use snapshot_port::{SnapshotError, SnapshotSource};
pub use subscriber_port::{SendError, SubscriberSink};
