use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use crate::errors::LlmError;
use crate::generator::{AnswerGenerator, AnswerRequest, AnswerStream};
use crate::prompt::data_sources;

/// Deterministic local provider. Describes what it was given instead of
/// calling a model, which keeps development setups and tests offline.
#[derive(Clone, Debug)]
pub struct EchoGenerator {
    chunk_words: usize,
}

impl Default for EchoGenerator {
    fn default() -> Self {
        Self { chunk_words: 4 }
    }
}

impl EchoGenerator {
    pub fn new(chunk_words: usize) -> Self {
        Self { chunk_words }
    }

    pub fn render(request: &AnswerRequest) -> String {
        let sources = data_sources(&request.context);
        let sources = if sources.is_empty() {
            "no data sources".to_string()
        } else {
            sources.join(", ")
        };
        format!(
            "Question from {user}: {query} Context: {bytes} bytes from {sources}.",
            user = request.caller.username,
            query = request.query.trim(),
            bytes = request.context.len(),
        )
    }
}

pub fn chunk_text_by_words(text: &str, chunk_size: usize) -> Vec<String> {
    if chunk_size == 0 {
        return if text.is_empty() {
            Vec::new()
        } else {
            vec![text.to_string()]
        };
    }
    let mut chunks = Vec::new();
    let mut buffer = Vec::new();
    for word in text.split_whitespace() {
        buffer.push(word);
        if buffer.len() == chunk_size {
            chunks.push(buffer.join(" "));
            buffer.clear();
        }
    }
    if !buffer.is_empty() {
        chunks.push(buffer.join(" "));
    }
    // Chunks after the first carry their leading space so concatenation
    // reproduces the text.
    chunks
        .into_iter()
        .enumerate()
        .map(|(idx, chunk)| if idx == 0 { chunk } else { format!(" {chunk}") })
        .collect()
}

#[async_trait]
impl AnswerGenerator for EchoGenerator {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn answer(&self, request: &AnswerRequest) -> Result<String, LlmError> {
        Ok(Self::render(request))
    }

    async fn answer_stream(&self, request: AnswerRequest) -> Result<AnswerStream, LlmError> {
        let chunks = chunk_text_by_words(&Self::render(&request), self.chunk_words);
        Ok(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}
