use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::errors::CacheError;
use crate::key::CacheKey;
use crate::layer::SharedKv;
use crate::metrics::SimpleStats;

/// Per-user cache of the serialised aggregation context.
///
/// Stored bytes are the exact UTF-8 of the context string; a hit returns
/// those same bytes so downstream prompt caching sees an identical prompt.
#[derive(Clone)]
pub struct ContextCache {
    store: SharedKv,
    ttl: Duration,
    stats: SimpleStats,
}

impl ContextCache {
    pub fn new(store: SharedKv, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            stats: SimpleStats::default(),
        }
    }

    pub fn stats(&self) -> &SimpleStats {
        &self.stats
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read failures and undecodable entries count as a miss.
    pub async fn get(&self, user_id: &str) -> Option<String> {
        let key = CacheKey::context(user_id);
        match self.store.get(&key).await {
            Ok(Some(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(context) => {
                    self.stats.record_hit();
                    debug!(target: "tamshai::cache", user_id, bytes = context.len(), "context cache hit");
                    Some(context)
                }
                Err(err) => {
                    self.stats.record_error();
                    warn!(target: "tamshai::cache", user_id, "cached context is not utf-8: {err}");
                    None
                }
            },
            Ok(None) => {
                self.stats.record_miss();
                None
            }
            Err(err) => {
                self.stats.record_error();
                self.stats.record_miss();
                warn!(target: "tamshai::cache", user_id, "context cache read failed: {err}");
                None
            }
        }
    }

    pub async fn store(
        &self,
        user_id: &str,
        context: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let key = CacheKey::context(user_id);
        let bytes = Bytes::copy_from_slice(context.as_bytes());
        self.store
            .set(&key, bytes, ttl.unwrap_or(self.ttl))
            .await
            .inspect(|_| self.stats.record_store())
            .inspect_err(|_| self.stats.record_error())
    }

    /// Detached write. The caller never waits on it; failures are logged.
    pub fn spawn_store(&self, user_id: String, context: String) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            if let Err(err) = cache.store(&user_id, &context, None).await {
                warn!(target: "tamshai::cache", user_id = %user_id, "context cache write failed: {err}");
            }
        })
    }
}
