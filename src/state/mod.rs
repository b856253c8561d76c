use std::sync::Arc;

use crate::context::AnswerService;
use crate::core::config::{AppConfig, AppPaths, UploadConfig};
use crate::llm::{GeminiProvider, LlmProvider, ModelSelector};
use crate::rag::{RetrievalService, SqliteVectorStore, VectorStore};
use crate::themes::{ThemeConfig, ThemeId};

pub mod error;

use error::InitializationError;

/// Everything one themed app needs to serve requests.
pub struct AppState {
    pub theme: Arc<ThemeConfig>,
    pub retrieval: Arc<RetrievalService>,
    pub answers: Arc<AnswerService>,
    pub upload: UploadConfig,
    pub cors_allowed_origins: Vec<String>,
}

impl AppState {
    /// Wires one theme from already-built collaborators.
    pub fn new(
        theme: ThemeConfig,
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStore>,
        selector: Arc<ModelSelector>,
        config: &AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let retrieval = RetrievalService::new(provider.clone(), store, theme.rag)
            .map_err(InitializationError::Retrieval)?;
        let answers = AnswerService::new(provider, selector, &theme);

        Ok(Arc::new(Self {
            theme: Arc::new(theme),
            retrieval: Arc::new(retrieval),
            answers: Arc::new(answers),
            upload: config.upload.clone(),
            cors_allowed_origins: config.server.cors_allowed_origins.clone(),
        }))
    }

    /// Builds the shared provider and database, then one state per theme.
    ///
    /// All themes share a single SQLite file, each in its own collection, and
    /// one model selector so a working model found by one theme is reused.
    pub async fn initialize(
        paths: &AppPaths,
        config: &AppConfig,
        themes: &[ThemeId],
    ) -> Result<Vec<Arc<Self>>, InitializationError> {
        let provider: Arc<dyn LlmProvider> = Arc::new(
            GeminiProvider::new(&config.gemini).map_err(InitializationError::Provider)?,
        );
        if config.gemini.api_key.is_none() {
            tracing::warn!(
                "GOOGLE_API_KEY is not set; uploads and chat will fail until it is configured"
            );
        }
        let selector = Arc::new(ModelSelector::new(config.gemini.candidate_models.clone()));

        let mut states = Vec::with_capacity(themes.len());
        let mut pool: Option<sqlx::SqlitePool> = None;

        for &id in themes {
            let store = match &pool {
                None => {
                    SqliteVectorStore::with_path(paths.vector_db_path.clone(), id.as_str()).await
                }
                Some(pool) => SqliteVectorStore::from_pool(pool.clone(), id.as_str()).await,
            }
            .map_err(InitializationError::Store)?;
            pool.get_or_insert_with(|| store.pool().clone());

            let theme = ThemeConfig::resolve(id, &config.themes);
            tracing::info!(
                theme = %id,
                collection = store.collection(),
                chunk_size = theme.rag.chunk_size,
                top_k = theme.rag.top_k,
                "theme ready"
            );

            states.push(Self::new(
                theme,
                provider.clone(),
                Arc::new(store),
                selector.clone(),
                config,
            )?);
        }

        Ok(states)
    }
}
