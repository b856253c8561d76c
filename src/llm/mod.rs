pub mod error;
pub mod gemini;
pub mod provider;
pub mod selection;
pub mod types;


pub use error::ProviderError;
pub use gemini::GeminiProvider;
pub use provider::LlmProvider;
pub use selection::{Attempt, ModelSelector, Selection};
pub use types::{EmbeddingMode, GenerationOutcome, ProviderModel};
