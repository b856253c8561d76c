use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::errors::ApiError;
use crate::llm::ProviderError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to open vector store: {0}")]
    Store(#[source] ApiError),

    #[error("Failed to initialize LLM provider: {0}")]
    Provider(#[source] ProviderError),

    #[error("Invalid retrieval settings: {0}")]
    Retrieval(#[source] ConfigError),
}
