//! Cache Store Adapters
//!
//! - [`InMemoryCacheStore`]: process-local map with expiry
//! - [`RedisCacheStore`]: Redis via a multiplexed connection manager

mod memory;
mod redis_store;

pub use memory::InMemoryCacheStore;
pub use redis_store::RedisCacheStore;
