pub use crate::config::{build_generator, LlmProviderConfig};
pub use crate::errors::LlmError;
pub use crate::generator::{AnswerGenerator, AnswerRequest, AnswerStream, SharedGenerator};
pub use crate::provider::claude::{ClaudeConfig, ClaudeGenerator};
pub use crate::provider::echo::{chunk_text_by_words, EchoGenerator};
