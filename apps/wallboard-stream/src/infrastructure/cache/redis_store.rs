use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::application::ports::{CacheStore, CacheStoreError};

/// Redis-backed cache store.
///
/// The connection manager reconnects on its own; individual command
/// failures surface as [`CacheStoreError`] and are treated as misses.
#[derive(Clone)]
pub struct RedisCacheStore {
    connection: ConnectionManager,
}

impl RedisCacheStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// # Errors
    ///
    /// Returns [`CacheStoreError::Unavailable`] if the URL is invalid or the
    /// initial connection fails.
    pub async fn connect(url: &str) -> Result<Self, CacheStoreError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let connection = ConnectionManager::new(client).await.map_err(unavailable)?;
        tracing::info!("Connected to Redis cache store");
        Ok(Self { connection })
    }
}

fn unavailable(e: redis::RedisError) -> CacheStoreError {
    CacheStoreError::Unavailable {
        message: e.to_string(),
    }
}

fn command_failed(e: redis::RedisError) -> CacheStoreError {
    CacheStoreError::CommandFailed {
        message: e.to_string(),
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        let mut connection = self.connection.clone();
        connection.get(key).await.map_err(command_failed)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheStoreError> {
        let mut connection = self.connection.clone();
        let seconds = ttl.as_secs().max(1);
        connection
            .set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(command_failed)
    }
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore").finish_non_exhaustive()
    }
}
