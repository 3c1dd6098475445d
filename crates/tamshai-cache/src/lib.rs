pub mod config;
pub mod confirm;
pub mod context;
pub mod errors;
pub mod key;
pub mod layer;
pub mod metrics;
pub mod prelude;

pub use confirm::ConfirmationStore;
pub use context::ContextCache;
pub use errors::CacheError;
pub use layer::{KvStore, MemoryKv};
