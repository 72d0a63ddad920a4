//! Configuration Module
//!
//! Environment-driven settings for the wallboard stream service.

mod settings;

pub use settings::{
    CacheBackend, CacheSettings, ConfigError, DataMode, MarketSettings, ServerSettings,
    StreamConfig,
};
