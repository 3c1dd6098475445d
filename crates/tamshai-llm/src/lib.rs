pub mod config;
pub mod errors;
pub mod generator;
pub mod prelude;
pub mod prompt;
pub mod provider;

pub use errors::LlmError;
pub use generator::{AnswerGenerator, AnswerRequest, AnswerStream, SharedGenerator};
