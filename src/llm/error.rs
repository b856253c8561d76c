use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("GOOGLE_API_KEY is not configured")]
    MissingApiKey,

    /// The model does not exist or is not served for this key.
    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request failed with status {status}: {message}")]
    Request { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited(_))
    }
}
