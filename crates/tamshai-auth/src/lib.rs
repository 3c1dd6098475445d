pub mod access;
pub mod errors;
pub mod identity;
pub mod prelude;
pub mod registry;

pub use errors::AuthError;
pub use registry::{ServerConfig, ServerRegistry};
