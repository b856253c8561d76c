//! Prioritised model fallback.
//!
//! The configured candidates are tried in order. When none of them answers,
//! the provider's model listing is consulted and every generation-capable
//! model not yet tried is attempted, `flash` variants first. The last model
//! that produced output is remembered and tried first on the next call.

use std::collections::HashSet;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::error::ProviderError;
use super::provider::LlmProvider;
use super::types::{normalize_model_name, GenerationOutcome};
use crate::core::errors::ApiError;

/// Result of asking a single model.
#[derive(Debug)]
pub enum Attempt {
    Generated(GenerationOutcome),
    /// Model unknown or not served for this key.
    Unavailable,
    Failed { rate_limited: bool, message: String },
}

impl Attempt {
    fn from_result(result: Result<GenerationOutcome, ProviderError>) -> Self {
        match result {
            Ok(outcome) => Attempt::Generated(outcome),
            Err(ProviderError::Unavailable(_)) => Attempt::Unavailable,
            Err(err) => Attempt::Failed {
                rate_limited: err.is_rate_limited(),
                message: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub model: String,
    pub outcome: GenerationOutcome,
}

pub struct ModelSelector {
    candidates: Vec<String>,
    active: RwLock<Option<String>>,
}

#[derive(Default)]
struct AttemptLog {
    tried: HashSet<String>,
    rate_limited: bool,
}

impl ModelSelector {
    pub fn new(candidates: Vec<String>) -> Self {
        let candidates = candidates
            .into_iter()
            .map(|name| normalize_model_name(name.trim()).to_string())
            .filter(|name| !name.is_empty())
            .collect();
        Self {
            candidates,
            active: RwLock::new(None),
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Model that answered most recently, if any.
    pub async fn active_model(&self) -> Option<String> {
        self.active.read().await.clone()
    }

    pub async fn generate(
        &self,
        provider: &dyn LlmProvider,
        prompt: &str,
    ) -> Result<Selection, ApiError> {
        let mut log = AttemptLog::default();

        let mut ordered = Vec::with_capacity(self.candidates.len() + 1);
        if let Some(active) = self.active_model().await {
            ordered.push(active);
        }
        ordered.extend(self.candidates.iter().cloned());

        for model in ordered {
            if let Some(selection) = self.try_model(provider, &model, prompt, &mut log).await? {
                return Ok(selection);
            }
        }

        info!(
            tried = log.tried.len(),
            "configured models exhausted, discovering available models"
        );
        match provider.list_models().await {
            Ok(models) => {
                for model in discovery_order(models.into_iter().filter_map(|m| {
                    m.supports_generation
                        .then(|| normalize_model_name(&m.name).to_string())
                })) {
                    if let Some(selection) =
                        self.try_model(provider, &model, prompt, &mut log).await?
                    {
                        return Ok(selection);
                    }
                }
            }
            Err(ProviderError::MissingApiKey) => return Err(ApiError::ServiceUnavailable),
            Err(err) => {
                if err.is_rate_limited() {
                    log.rate_limited = true;
                }
                warn!(error = %err, "model discovery failed");
            }
        }

        if log.rate_limited {
            Err(ApiError::RateLimited)
        } else {
            Err(ApiError::ServiceUnavailable)
        }
    }

    /// Returns `Ok(None)` when the caller should move on to the next model.
    async fn try_model(
        &self,
        provider: &dyn LlmProvider,
        model: &str,
        prompt: &str,
        log: &mut AttemptLog,
    ) -> Result<Option<Selection>, ApiError> {
        if !log.tried.insert(model.to_string()) {
            return Ok(None);
        }

        let result = provider.generate(model, prompt).await;
        if matches!(result, Err(ProviderError::MissingApiKey)) {
            return Err(ApiError::ServiceUnavailable);
        }

        match Attempt::from_result(result) {
            Attempt::Generated(outcome) => {
                debug!(model, "model produced a response");
                *self.active.write().await = Some(model.to_string());
                Ok(Some(Selection {
                    model: model.to_string(),
                    outcome,
                }))
            }
            Attempt::Unavailable => {
                debug!(model, "model unavailable");
                Ok(None)
            }
            Attempt::Failed {
                rate_limited,
                message,
            } => {
                warn!(model, rate_limited, error = %message, "generation attempt failed");
                log.rate_limited |= rate_limited;
                Ok(None)
            }
        }
    }
}

/// Orders discovered model names with `flash` variants first, keeping
/// listing order otherwise.
fn discovery_order(names: impl Iterator<Item = String>) -> Vec<String> {
    let (mut flash, other): (Vec<String>, Vec<String>) =
        names.partition(|name| name.contains("flash"));
    flash.extend(other);
    flash
}
