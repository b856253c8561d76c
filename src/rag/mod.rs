//! Retrieval-augmented generation: chunking, vector storage and the
//! per-theme ingestion/retrieval service.

pub mod chunker;
pub mod context_builder;
pub mod pipeline;
pub mod sqlite;
pub mod store;

pub use chunker::{Chunker, TextWindow};
pub use context_builder::RetrievedContext;
pub use pipeline::{DocumentSummary, IngestProgress, PageText, RetrievalService};
pub use sqlite::SqliteVectorStore;
pub use store::{ChunkRecord, Metadata, SearchMatch, StoredChunk, VectorStore};
