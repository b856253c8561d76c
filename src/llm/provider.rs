use async_trait::async_trait;

use super::error::ProviderError;
use super::types::{EmbeddingMode, GenerationOutcome, ProviderModel};

/// Hosted embedding + generation service.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "gemini")
    fn name(&self) -> &str;

    /// embed a single text; an empty vector means "no embedding returned"
    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, ProviderError>;

    /// generate a completion for `prompt` with the named model
    async fn generate(&self, model: &str, prompt: &str)
        -> Result<GenerationOutcome, ProviderError>;

    /// list models visible to the configured credentials
    async fn list_models(&self) -> Result<Vec<ProviderModel>, ProviderError>;
}
