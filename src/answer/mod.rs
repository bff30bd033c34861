//! Answering a support question end to end: retrieval, prompting and the
//! tool-capable generation exchange.

pub mod orchestrator;
pub mod prompt;

pub use orchestrator::{AnswerError, AnswerOptions, AnswerPipeline};
pub use prompt::FALLBACK_SENTENCE;
