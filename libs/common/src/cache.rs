//! Key/value cache used for session bookkeeping
//!
//! Consumers depend on [`Cache`]; [`RedisCache`] is the production backend.
//! All keys written through a `RedisCache` are namespaced with its prefix so
//! several deployments can share one Redis database.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::info;

const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
const DEFAULT_KEY_PREFIX: &str = "media_share:";

/// Key/value operations with optional expiry
#[async_trait]
pub trait Cache: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl_seconds` when given
    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub key_prefix: String,
}

impl RedisConfig {
    /// Read `REDIS_URL` and `REDIS_KEY_PREFIX`
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string()),
            key_prefix: std::env::var("REDIS_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string()),
        })
    }
}

/// Redis-backed [`Cache`] over a reconnecting connection manager
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Connect to the configured Redis server
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str()).context("invalid REDIS_URL")?;
        let connection = ConnectionManager::new(client)
            .await
            .context("cannot connect to Redis")?;

        info!("Connected to Redis at {}", config.url);
        Ok(Self {
            connection,
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// Whether the server answers `PING`
    pub async fn health_check(&self) -> Result<bool> {
        let mut connection = self.connection.clone();
        let reply: String = redis::cmd("PING").query_async(&mut connection).await?;
        Ok(reply == "PONG")
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let key = self.namespaced(key);
        let mut connection = self.connection.clone();

        let _: () = match ttl_seconds {
            // SETEX rejects a zero expiry
            Some(ttl) => connection.set_ex(key, value, ttl.max(1)).await?,
            None => connection.set(key, value).await?,
        };
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut connection = self.connection.clone();
        let value: Option<String> = connection.get(self.namespaced(key)).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut connection = self.connection.clone();
        let _: u64 = connection.del(self.namespaced(key)).await?;
        Ok(())
    }
}
