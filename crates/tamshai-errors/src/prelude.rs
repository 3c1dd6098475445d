pub use crate::code::{codes, ErrorCode};
pub use crate::kind::ErrorKind;
pub use crate::model::{ErrorBuilder, ErrorObj, PublicErrorView};
pub use crate::retry::RetryClass;
