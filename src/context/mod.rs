//! Prompt assembly and answer shaping for chat turns.

pub mod answer;
pub mod prompt;

pub use answer::{AnswerService, ChatAnswer};
pub use prompt::build_prompt;
