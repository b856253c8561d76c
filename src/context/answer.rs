//! Final step of a chat turn: prompt the model and shape the reply.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::prompt::build_prompt;
use crate::core::errors::ApiError;
use crate::llm::{GenerationOutcome, LlmProvider, ModelSelector};
use crate::rag::RetrievedContext;
use crate::themes::ThemeConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatAnswer {
    pub text: String,
    /// Metadata of every context chunk the prompt included.
    pub sources: Vec<Value>,
    pub model: String,
}

pub struct AnswerService {
    provider: Arc<dyn LlmProvider>,
    selector: Arc<ModelSelector>,
    system_prompt: String,
    silent_message: String,
    redacted_message: String,
}

impl AnswerService {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        selector: Arc<ModelSelector>,
        theme: &ThemeConfig,
    ) -> Self {
        Self {
            provider,
            selector,
            system_prompt: theme.system_prompt.clone(),
            silent_message: theme.silent_message.clone(),
            redacted_message: theme.redacted_message.clone(),
        }
    }

    pub async fn answer(
        &self,
        query: &str,
        context: &RetrievedContext,
    ) -> Result<ChatAnswer, ApiError> {
        let prompt = build_prompt(&self.system_prompt, &context.text(), query);
        let selection = self.selector.generate(self.provider.as_ref(), &prompt).await?;

        let text = match selection.outcome {
            GenerationOutcome::Text(text) => text,
            GenerationOutcome::Blocked { reason } => {
                warn!(model = %selection.model, reason = %reason, "response withheld by safety filter");
                self.redacted_message.clone()
            }
            GenerationOutcome::Empty => {
                info!(model = %selection.model, "model returned no text");
                self.silent_message.clone()
            }
        };

        Ok(ChatAnswer {
            text,
            sources: context.sources(),
            model: selection.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{EmbeddingMode, ProviderError, ProviderModel};
    use crate::rag::{Metadata, SearchMatch};
    use crate::themes::ghost;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct FixedProvider {
        outcome: GenerationOutcome,
        last_prompt: Mutex<Option<String>>,
    }

    impl FixedProvider {
        fn new(outcome: GenerationOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn embed(&self, _: &str, _: EmbeddingMode) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![1.0])
        }

        async fn generate(
            &self,
            _model: &str,
            prompt: &str,
        ) -> Result<GenerationOutcome, ProviderError> {
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            Ok(self.outcome.clone())
        }

        async fn list_models(&self) -> Result<Vec<ProviderModel>, ProviderError> {
            Ok(Vec::new())
        }
    }

    fn service(provider: Arc<FixedProvider>) -> AnswerService {
        AnswerService::new(
            provider,
            Arc::new(ModelSelector::new(vec!["gemini-test".to_string()])),
            &ghost::theme(),
        )
    }

    fn context() -> RetrievedContext {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!("grimoire.pdf"));
        metadata.insert("page".to_string(), json!(13));
        RetrievedContext {
            matches: vec![SearchMatch {
                text: "The candle must burn at midnight.".to_string(),
                metadata,
                distance: 0.1,
            }],
        }
    }

    #[tokio::test]
    async fn text_answer_carries_sources_and_model() {
        let provider = FixedProvider::new(GenerationOutcome::Text("At midnight.".to_string()));
        let answer = service(provider.clone())
            .answer("When?", &context())
            .await
            .unwrap();

        assert_eq!(answer.text, "At midnight.");
        assert_eq!(answer.model, "gemini-test");
        assert_eq!(answer.sources, vec![json!({"source": "grimoire.pdf", "page": 13})]);

        let prompt = provider.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Spirit of the Ouija Board"));
        assert!(prompt.contains("The candle must burn at midnight."));
        assert!(prompt.contains("USER QUESTION:\nWhen?"));
    }

    #[tokio::test]
    async fn blocked_answer_uses_redacted_message() {
        let provider = FixedProvider::new(GenerationOutcome::Blocked {
            reason: "SAFETY".to_string(),
        });
        let answer = service(provider).answer("?", &context()).await.unwrap();
        assert_eq!(answer.text, ghost::theme().redacted_message);
    }

    #[tokio::test]
    async fn empty_answer_uses_silent_message() {
        let provider = FixedProvider::new(GenerationOutcome::Empty);
        let answer = service(provider)
            .answer("?", &RetrievedContext::default())
            .await
            .unwrap();
        assert_eq!(answer.text, ghost::theme().silent_message);
        assert!(answer.sources.is_empty());
    }
}
