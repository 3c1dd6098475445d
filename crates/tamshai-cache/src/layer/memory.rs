use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;

use super::KvStore;
use crate::errors::CacheError;
use crate::key::CacheKey;

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub value: Bytes,
    pub stored_at_ms: i64,
    pub ttl_ms: i64,
}

impl CacheEntry {
    pub fn new(value: Bytes, ttl_ms: i64) -> Self {
        Self {
            value,
            stored_at_ms: Utc::now().timestamp_millis(),
            ttl_ms,
        }
    }

    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms < self.stored_at_ms.saturating_add(self.ttl_ms)
    }
}

/// In-process stand-in for the shared store, used in development and tests.
#[derive(Clone, Debug)]
pub struct MemoryKv {
    inner: Arc<Mutex<HashMap<String, CacheEntry>>>,
    capacity: usize,
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl MemoryKv {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        let now = Utc::now().timestamp_millis();
        self.inner.lock().values().filter(|e| e.is_fresh(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn make_room(map: &mut HashMap<String, CacheEntry>, capacity: usize, now: i64) {
        if map.len() < capacity {
            return;
        }
        map.retain(|_, entry| entry.is_fresh(now));
        while map.len() >= capacity {
            let oldest = map
                .iter()
                .min_by_key(|(_, e)| e.stored_at_ms)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    map.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        let now = Utc::now().timestamp_millis();
        let mut guard = self.inner.lock();
        match guard.get(key.as_str()) {
            Some(entry) if entry.is_fresh(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                guard.remove(key.as_str());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = CacheEntry::new(value, ttl_ms);
        let mut guard = self.inner.lock();
        if !guard.contains_key(key.as_str()) {
            Self::make_room(&mut guard, self.capacity, entry.stored_at_ms);
        }
        guard.insert(key.as_str().to_string(), entry);
        Ok(())
    }

    async fn take(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        let now = Utc::now().timestamp_millis();
        let entry = self.inner.lock().remove(key.as_str());
        Ok(entry.filter(|e| e.is_fresh(now)).map(|e| e.value))
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.inner.lock().remove(key.as_str());
        Ok(())
    }
}
