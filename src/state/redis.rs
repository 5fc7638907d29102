use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, RedisResult};

use super::kv::KvStore;
use crate::errors::StoreError;

/// Redis-backed store. Plain GET/SET, no expiry.
#[derive(Clone)]
pub struct RedisStore {
    connection_manager: ConnectionManager,
}

impl RedisStore {
    pub async fn new(url: &str) -> RedisResult<Self> {
        let client = redis::Client::open(url)?;
        let connection_manager = ConnectionManager::new(client).await?;

        Ok(Self { connection_manager })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection_manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut conn = self.connection_manager.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }
}
