use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;

use super::KvStore;
use crate::errors::CacheError;
use crate::key::CacheKey;

#[derive(Clone)]
pub struct RedisKv {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisKv {
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)
            .map_err(|err| CacheError::unavailable(&format!("redis url invalid: {err}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|err| CacheError::unavailable(&format!("redis connect failed: {err}")))?;
        Ok(Self {
            conn,
            prefix: prefix.into(),
        })
    }

    fn full_key(&self, key: &CacheKey) -> String {
        if self.prefix.is_empty() {
            key.as_str().to_string()
        } else {
            format!("{}{}", self.prefix, key.as_str())
        }
    }
}

fn redis_err(op: &str, err: redis::RedisError) -> CacheError {
    CacheError::unavailable(&format!("redis {op} failed: {err}"))
}

#[async_trait]
impl KvStore for RedisKv {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|err| redis_err("GET", err))?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let _: () = redis::cmd("SET")
            .arg(self.full_key(key))
            .arg(value.as_ref())
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|err| redis_err("SET", err))?;
        Ok(())
    }

    async fn take(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GETDEL")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|err| redis_err("GETDEL", err))?;
        Ok(value.map(Bytes::from))
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|err| redis_err("DEL", err))?;
        Ok(())
    }
}
