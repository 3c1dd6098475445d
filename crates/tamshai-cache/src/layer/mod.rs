use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::CacheError;
use crate::key::CacheKey;

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryKv;
#[cfg(feature = "redis")]
pub use self::redis::RedisKv;

/// Shared, keyed store with per-key expiry. Each call is a single atomic
/// operation on the backend; callers never hold a record across requests.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError>;

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    /// Reads and removes in one step. Two concurrent takes never both see
    /// the value.
    async fn take(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError>;

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError>;
}

pub type SharedKv = Arc<dyn KvStore>;
