//! Application Services
//!
//! - [`CategoryFetcher`]: typed dispatch from category to provider call
//! - [`FreshnessCache`]: per-category cache-aside with stale fallback
//! - [`SnapshotAggregator`]: concurrent build of a full snapshot
//! - [`SubscriberRegistry`]: subscriber set, fan-out and the broadcast loop
//! - [`SubscriberSession`]: per-connection inbound handling
//! - [`SnapshotService`]: facade used by the transport layer

mod aggregator;
mod facade;
mod fetcher;
mod freshness_cache;
mod registry;
mod session;

pub use aggregator::SnapshotAggregator;
pub use facade::SnapshotService;
pub use fetcher::CategoryFetcher;
pub use freshness_cache::{CacheTtl, FreshnessCache, FreshnessRecord};
pub use registry::{BroadcastLoopSettings, LoopStats, SubscriberRegistry};
pub use session::{InboundEvent, SessionSettings, SubscriberSession};
