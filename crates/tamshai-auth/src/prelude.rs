pub use crate::access::{accessible, authorize, denied, has_access, AccessPartition};
pub use crate::errors::AuthError;
pub use crate::identity::{apply_identity_headers, identity_from_headers};
pub use crate::registry::{ServerConfig, ServerRegistry};
