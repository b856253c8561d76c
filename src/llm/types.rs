use serde::{Deserialize, Serialize};

/// Which side of an asymmetric retrieval embedding a text is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMode {
    Document,
    Query,
}

impl EmbeddingMode {
    pub fn task_type(self) -> &'static str {
        match self {
            EmbeddingMode::Document => "RETRIEVAL_DOCUMENT",
            EmbeddingMode::Query => "RETRIEVAL_QUERY",
        }
    }
}

/// What a generation call produced when the request itself succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Text(String),
    /// Output withheld by the provider's safety filters.
    Blocked { reason: String },
    /// No candidates or no text parts.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderModel {
    pub name: String,
    pub supports_generation: bool,
}

/// Strips the `models/` resource prefix so names compare equal.
pub fn normalize_model_name(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}
