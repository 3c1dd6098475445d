use serde::{Deserialize, Serialize};

use crate::retry::RetryClass;

/// Failure taxonomy shared by every crate in the gateway.
///
/// `Timeout` and `Backend` are the two kinds that take part in partial-success
/// aggregation during fan-out; everything else maps straight to an HTTP error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    Timeout,
    Backend,
    Unavailable,
    Integrity,
    Internal,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Authorization => "authorization",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Backend => "backend",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Internal => "internal",
        }
    }

    pub const fn retry_class(self) -> RetryClass {
        match self {
            ErrorKind::Timeout | ErrorKind::Unavailable => RetryClass::Transient,
            ErrorKind::Backend => RetryClass::Transient,
            ErrorKind::Validation
            | ErrorKind::Authentication
            | ErrorKind::Authorization
            | ErrorKind::NotFound => RetryClass::None,
            ErrorKind::Integrity | ErrorKind::Internal => RetryClass::Permanent,
        }
    }
}
