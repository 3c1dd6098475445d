pub use crate::config::{build_store, CacheBackendConfig};
pub use crate::confirm::ConfirmationStore;
pub use crate::context::ContextCache;
pub use crate::errors::CacheError;
pub use crate::key::CacheKey;
pub use crate::layer::{KvStore, MemoryKv, SharedKv};
pub use crate::metrics::{SimpleStats, StatsSnapshot};
