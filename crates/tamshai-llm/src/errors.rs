use tamshai_errors::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct LlmError(pub Box<ErrorObj>);

impl LlmError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn provider_unavailable(detail: &str) -> Self {
        LlmError(Box::new(
            ErrorBuilder::new(codes::LLM_ERROR)
                .user_msg("The AI service could not produce an answer.")
                .dev_msg(detail)
                .suggested_action("Retry the question in a moment.")
                .build(),
        ))
    }

    pub fn schema(detail: &str) -> Self {
        LlmError(Box::new(
            ErrorBuilder::new(codes::LLM_ERROR)
                .user_msg("The AI service rejected the request.")
                .dev_msg(detail)
                .build(),
        ))
    }

    pub fn config(detail: &str) -> Self {
        LlmError(Box::new(
            ErrorBuilder::new(codes::INTERNAL_ERROR)
                .user_msg("AI provider is misconfigured.")
                .dev_msg(detail)
                .build(),
        ))
    }
}

impl From<LlmError> for ErrorObj {
    fn from(err: LlmError) -> Self {
        err.into_inner()
    }
}
