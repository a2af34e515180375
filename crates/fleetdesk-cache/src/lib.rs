//! Redis caching layer for Fleetdesk
//!
//! Implements the `CacheService` trait from fleetdesk-core on top of a Redis
//! `ConnectionManager`. Lists are the only structure in use: per-agency recent searches are
//! pushed onto the head and trimmed to a fixed length.
//!
//! # Example
//!
//! ```no_run
//! use fleetdesk_cache::RedisCache;
//! use fleetdesk_core::traits::CacheService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = RedisCache::new("redis://127.0.0.1:6379").await?;
//!
//!     cache.push_capped("recent", "smith", 10).await?;
//!     let recent = cache.list_head("recent", 10).await?;
//!     assert_eq!(recent.first().map(String::as_str), Some("smith"));
//!
//!     Ok(())
//! }
//! ```

pub mod keys;

use async_trait::async_trait;
use fleetdesk_core::error::AppError;
use fleetdesk_core::traits::CacheService;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use tracing::{debug, error, warn};

/// Redis cache with a multiplexed connection
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis
    ///
    /// # Errors
    ///
    /// Returns `AppError::CacheConnection` if the URL is invalid or the server is unreachable
    pub async fn new(url: &str) -> Result<Self, AppError> {
        debug!("Connecting to Redis at {}", url);

        let client = Client::open(url).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            AppError::CacheConnection(format!("Invalid Redis URL: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to establish Redis connection: {}", e);
            AppError::CacheConnection(format!("Connection failed: {}", e))
        })?;

        debug!("Redis connection established");
        Ok(Self { manager })
    }

    /// Ping the server
    pub async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_redis_error)?;
        Ok(())
    }

    #[cfg(test)]
    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let _: i64 = conn.del(key).await.map_err(Self::map_redis_error)?;
        Ok(())
    }

    /// Convert RedisError to AppError
    fn map_redis_error(err: RedisError) -> AppError {
        match err.kind() {
            redis::ErrorKind::IoError => {
                error!("Redis I/O error: {}", err);
                AppError::CacheConnection(format!("I/O error: {}", err))
            }
            redis::ErrorKind::TypeError => {
                warn!("Redis type error: {}", err);
                AppError::Cache(format!("Type mismatch: {}", err))
            }
            _ => {
                error!("Redis error: {}", err);
                AppError::Cache(err.to_string())
            }
        }
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn push_capped(&self, key: &str, value: &str, cap: usize) -> Result<(), AppError> {
        debug!("LPUSH {} (cap {})", key, cap);
        if cap == 0 {
            return Ok(());
        }
        let mut conn = self.manager.clone();

        let _: () = redis::pipe()
            .atomic()
            .lpush(key, value)
            .ignore()
            .ltrim(key, 0, cap as isize - 1)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(Self::map_redis_error)?;
        Ok(())
    }

    async fn list_head(&self, key: &str, count: usize) -> Result<Vec<String>, AppError> {
        debug!("LRANGE {} 0..{}", key, count);
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.manager.clone();

        conn.lrange(key, 0, count as isize - 1)
            .await
            .map_err(Self::map_redis_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_cache(key: &str) -> RedisCache {
        let cache = RedisCache::new("redis://127.0.0.1:6379")
            .await
            .expect("Failed to connect to Redis");
        cache.delete(key).await.expect("Failed to clear key");
        cache
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_ping() {
        let cache = setup_cache("fleetdesk_test:ping").await;
        assert!(cache.ping().await.is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_push_capped_keeps_newest() {
        let key = "fleetdesk_test:capped";
        let cache = setup_cache(key).await;

        for term in ["a", "b", "c", "d"] {
            cache.push_capped(key, term, 3).await.unwrap();
        }

        let head = cache.list_head(key, 10).await.unwrap();
        assert_eq!(head, vec!["d", "c", "b"]);
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_list_head_missing_key() {
        let key = "fleetdesk_test:missing";
        let cache = setup_cache(key).await;

        assert!(cache.list_head(key, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let result = RedisCache::new("not-a-url").await;
        assert!(matches!(result, Err(AppError::CacheConnection(_))));
    }
}
