use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::CacheError;
use crate::layer::{MemoryKv, SharedKv};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheBackendConfig {
    Memory {
        #[serde(default = "default_capacity")]
        capacity: usize,
    },
    Redis {
        url: String,
        #[serde(default)]
        key_prefix: String,
    },
}

fn default_capacity() -> usize {
    10_000
}

impl Default for CacheBackendConfig {
    fn default() -> Self {
        CacheBackendConfig::Memory {
            capacity: default_capacity(),
        }
    }
}

pub async fn build_store(cfg: &CacheBackendConfig) -> Result<SharedKv, CacheError> {
    match cfg {
        CacheBackendConfig::Memory { capacity } => Ok(Arc::new(MemoryKv::new(*capacity))),
        #[cfg(feature = "redis")]
        CacheBackendConfig::Redis { url, key_prefix } => {
            let kv = crate::layer::RedisKv::connect(url, key_prefix.clone()).await?;
            Ok(Arc::new(kv))
        }
        #[cfg(not(feature = "redis"))]
        CacheBackendConfig::Redis { .. } => Err(CacheError::feature_disabled(
            "redis",
            "enable the 'redis' feature on tamshai-cache to use a Redis backend",
        )),
    }
}
