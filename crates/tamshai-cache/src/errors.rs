use tamshai_errors::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct CacheError(pub Box<ErrorObj>);

impl CacheError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn unavailable(detail: &str) -> Self {
        CacheError(Box::new(
            ErrorBuilder::new(codes::CACHE_UNAVAILABLE)
                .user_msg("Session store is temporarily unavailable.")
                .dev_msg(detail)
                .suggested_action("Retry the request in a few seconds.")
                .build(),
        ))
    }

    pub fn codec(detail: &str) -> Self {
        CacheError(Box::new(
            ErrorBuilder::new(codes::INTERNAL_ERROR)
                .user_msg("Stored record could not be decoded.")
                .dev_msg(detail)
                .build(),
        ))
    }

    pub fn feature_disabled(feature: &str, detail: &str) -> Self {
        CacheError(Box::new(
            ErrorBuilder::new(codes::INTERNAL_ERROR)
                .user_msg("Required capability is disabled.")
                .dev_msg(format!("feature '{feature}' is disabled: {detail}"))
                .build(),
        ))
    }
}

impl From<CacheError> for ErrorObj {
    fn from(err: CacheError) -> Self {
        err.into_inner()
    }
}
