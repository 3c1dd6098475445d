pub mod client;
pub mod errors;
pub mod metrics;
pub mod pagination;
pub mod policy;
pub mod prelude;
pub mod types;

pub use client::{ClientBuilder, HttpQueryClient, QueryClient};
pub use errors::NetError;
