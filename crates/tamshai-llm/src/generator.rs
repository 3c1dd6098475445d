use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use tamshai_types::prelude::CallerIdentity;

use crate::errors::LlmError;

/// Ordered text fragments of one answer.
pub type AnswerStream = BoxStream<'static, Result<String, LlmError>>;

#[derive(Clone, Debug)]
pub struct AnswerRequest {
    pub query: String,
    /// Aggregated data context. Passed through byte for byte.
    pub context: String,
    pub caller: CallerIdentity,
    pub conversation_id: Option<String>,
}

impl AnswerRequest {
    pub fn new(query: impl Into<String>, context: impl Into<String>, caller: CallerIdentity) -> Self {
        Self {
            query: query.into(),
            context: context.into(),
            caller,
            conversation_id: None,
        }
    }

    pub fn with_conversation(mut self, conversation_id: Option<String>) -> Self {
        self.conversation_id = conversation_id;
        self
    }
}

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn answer(&self, request: &AnswerRequest) -> Result<String, LlmError>;

    async fn answer_stream(&self, request: AnswerRequest) -> Result<AnswerStream, LlmError>;
}

pub type SharedGenerator = Arc<dyn AnswerGenerator>;
