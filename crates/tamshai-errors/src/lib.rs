pub mod code;
pub mod kind;
pub mod model;
pub mod prelude;
pub mod retry;

pub use code::{codes, ErrorCode};
pub use kind::ErrorKind;
pub use model::{ErrorBuilder, ErrorObj, PublicErrorView};
pub use retry::RetryClass;
