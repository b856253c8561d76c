//! Ingestion, retrieval and document management for one collection.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::chunker::Chunker;
use super::context_builder::RetrievedContext;
use super::store::{ChunkRecord, Metadata, SearchMatch, VectorStore};
use crate::core::config::{ConfigError, RagSettings};
use crate::core::errors::ApiError;
use crate::llm::{EmbeddingMode, LlmProvider};

/// Extracted text of one page, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page: u32,
    pub text: String,
}

/// Sent after each page has been chunked and embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestProgress {
    pub page: u32,
    pub pages_done: usize,
    pub pages_total: usize,
    pub chunks_so_far: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub source: String,
    pub pages: usize,
    pub chunks: usize,
}

pub struct RetrievalService {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorStore>,
    chunker: Chunker,
    settings: RagSettings,
}

impl RetrievalService {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStore>,
        settings: RagSettings,
    ) -> Result<Self, ConfigError> {
        let chunker = Chunker::new(settings.chunk_size, settings.chunk_overlap)?;
        Ok(Self {
            provider,
            store,
            chunker,
            settings,
        })
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Chunks, embeds and stores every page of a document.
    ///
    /// All embeddings are computed before anything is written, so a provider
    /// failure leaves the store untouched. Returns the number of chunks stored.
    pub async fn ingest(
        &self,
        document_id: &str,
        pages: &[PageText],
        base_metadata: Metadata,
        progress: Option<&mpsc::Sender<IngestProgress>>,
    ) -> Result<usize, ApiError> {
        let existing = self.chunk_ids_for(document_id).await?;
        if !existing.is_empty() {
            warn!(
                document = document_id,
                existing_chunks = existing.len(),
                "document already ingested; chunks with matching ids will be replaced and stale ones kept"
            );
        }

        info!(document = document_id, pages = pages.len(), "ingesting document");

        let mut records = Vec::new();
        for (done, page) in pages.iter().enumerate() {
            for window in self.chunker.chunk(&page.text) {
                let index = window.index;
                let embedding = self
                    .provider
                    .embed(&window.text, EmbeddingMode::Document)
                    .await?;
                if embedding.is_empty() {
                    debug!(document = document_id, page = page.page, index, "empty embedding, chunk skipped");
                    continue;
                }

                let mut metadata = base_metadata.clone();
                metadata.insert("chunk_index".to_string(), json!(records.len()));
                metadata.insert("source".to_string(), json!(document_id));
                metadata.insert("page".to_string(), json!(page.page));

                records.push(ChunkRecord {
                    chunk_id: format!("{}_p{}_{}", document_id, page.page, index),
                    source: document_id.to_string(),
                    content: window.text,
                    metadata,
                    embedding,
                });
            }

            if let Some(sender) = progress {
                // the receiver going away must not stop ingestion
                let _ = sender
                    .send(IngestProgress {
                        page: page.page,
                        pages_done: done + 1,
                        pages_total: pages.len(),
                        chunks_so_far: records.len(),
                    })
                    .await;
            }
        }

        let stored = records.len();
        self.store.upsert(records).await?;
        info!(document = document_id, chunks = stored, "document ingested");
        Ok(stored)
    }

    /// Nearest `k` chunks to `query`, optionally restricted to `sources`.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        sources: Option<&[String]>,
    ) -> Result<Vec<SearchMatch>, ApiError> {
        let embedding = self.provider.embed(query, EmbeddingMode::Query).await?;
        if embedding.is_empty() {
            return Err(ApiError::Internal("query embedding was empty".to_string()));
        }
        self.store.query(&embedding, k, sources).await
    }

    /// Top-k search followed by the relevance filter.
    pub async fn relevant_context(
        &self,
        query: &str,
        sources: Option<&[String]>,
    ) -> Result<RetrievedContext, ApiError> {
        let results = self.search(query, self.settings.top_k, sources).await?;
        let found = results.len();
        let context = RetrievedContext::from_matches(results, self.settings.relevance_threshold);
        debug!(found, kept = context.matches.len(), "retrieved context");
        Ok(context)
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, ApiError> {
        let chunks = self.store.get_all(None).await?;

        let mut grouped: BTreeMap<String, (BTreeSet<String>, usize)> = BTreeMap::new();
        for chunk in chunks {
            let source = match chunk.metadata.get("source") {
                Some(Value::String(s)) => s.clone(),
                _ => chunk.source,
            };
            let entry = grouped.entry(source).or_default();
            if let Some(page) = chunk.metadata.get("page") {
                entry.0.insert(page.to_string());
            }
            entry.1 += 1;
        }

        Ok(grouped
            .into_iter()
            .map(|(source, (pages, chunks))| DocumentSummary {
                source,
                pages: pages.len(),
                chunks,
            })
            .collect())
    }

    /// Removes every chunk of `source`; unknown sources remove nothing.
    pub async fn delete_document(&self, source: &str) -> Result<usize, ApiError> {
        let ids = self.chunk_ids_for(source).await?;
        if ids.is_empty() {
            return Ok(0);
        }
        let removed = self.store.delete_by_ids(&ids).await?;
        info!(document = source, chunks = removed, "document deleted");
        Ok(removed)
    }

    async fn chunk_ids_for(&self, source: &str) -> Result<Vec<String>, ApiError> {
        let filter = [source.to_string()];
        Ok(self
            .store
            .get_all(Some(&filter))
            .await?
            .into_iter()
            .map(|chunk| chunk.chunk_id)
            .collect())
    }
}
