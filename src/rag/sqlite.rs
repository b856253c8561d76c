//! SQLite-backed vector store.
//!
//! One `vector_chunks` table holds every collection; each theme reads and
//! writes only its own. Embeddings are little-endian f32 blobs and search is
//! brute-force cosine distance, which is fine at personal-corpus sizes.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use super::store::{cosine_distance, ChunkRecord, Metadata, SearchMatch, StoredChunk, VectorStore};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
}

impl SqliteVectorStore {
    pub async fn new(paths: &AppPaths, collection: &str) -> Result<Self, ApiError> {
        Self::with_path(paths.vector_db_path.clone(), collection).await
    }

    pub async fn with_path(db_path: PathBuf, collection: &str) -> Result<Self, ApiError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(ApiError::internal)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        Self::from_pool(pool, collection).await
    }

    /// Shares an existing pool, so several collections can live in one file.
    pub async fn from_pool(pool: SqlitePool, collection: &str) -> Result<Self, ApiError> {
        let store = Self {
            pool,
            collection: collection.to_string(),
        };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vector_chunks (
                collection TEXT NOT NULL,
                chunk_id TEXT NOT NULL,
                source TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (collection, chunk_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_vector_chunks_source
             ON vector_chunks(collection, source)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn parse_metadata(raw: &str) -> Metadata {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => Metadata::new(),
        }
    }

    fn row_to_chunk(row: &SqliteRow) -> StoredChunk {
        let metadata: String = row.get("metadata");
        StoredChunk {
            chunk_id: row.get("chunk_id"),
            source: row.get("source"),
            content: row.get("content"),
            metadata: Self::parse_metadata(&metadata),
        }
    }

    /// `SELECT ... WHERE collection = ? [AND source IN (...)]`, in insertion order.
    fn select_rows<'a>(
        &'a self,
        columns: &str,
        sources: Option<&'a [String]>,
    ) -> QueryBuilder<'a, Sqlite> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM vector_chunks WHERE collection = ",
            columns
        ));
        builder.push_bind(self.collection.as_str());

        if let Some(sources) = sources.filter(|s| !s.is_empty()) {
            builder.push(" AND source IN (");
            let mut separated = builder.separated(", ");
            for source in sources {
                separated.push_bind(source.as_str());
            }
            separated.push_unseparated(")");
        }

        builder.push(" ORDER BY rowid");
        builder
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, records: Vec<ChunkRecord>) -> Result<(), ApiError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for record in &records {
            let blob = Self::serialize_embedding(&record.embedding);
            let metadata = serde_json::to_string(&record.metadata).map_err(ApiError::internal)?;

            sqlx::query(
                "INSERT OR REPLACE INTO vector_chunks
                    (collection, chunk_id, source, content, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&self.collection)
            .bind(&record.chunk_id)
            .bind(&record.source)
            .bind(&record.content)
            .bind(&metadata)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(collection = %self.collection, count = records.len(), "upserted chunks");
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        sources: Option<&[String]>,
    ) -> Result<Vec<SearchMatch>, ApiError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = self
            .select_rows("content, metadata, embedding", sources)
            .build()
            .fetch_all(&self.pool)
            .await?;

        let mut scored: Vec<SearchMatch> = rows
            .iter()
            .filter_map(|row| {
                let bytes: Vec<u8> = row.get("embedding");
                if bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&bytes);
                if stored.len() != embedding.len() {
                    return None;
                }
                let metadata: String = row.get("metadata");

                Some(SearchMatch {
                    text: row.get("content"),
                    metadata: Self::parse_metadata(&metadata),
                    distance: cosine_distance(embedding, &stored),
                })
            })
            .collect();

        // stable: equal distances keep insertion order
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);

        Ok(scored)
    }

    async fn get_all(&self, sources: Option<&[String]>) -> Result<Vec<StoredChunk>, ApiError> {
        let rows = self
            .select_rows("chunk_id, source, content, metadata", sources)
            .build()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(Self::row_to_chunk).collect())
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<usize, ApiError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut deleted = 0u64;
        let mut tx = self.pool.begin().await?;

        // stay well below SQLite's bound-parameter limit
        for batch in ids.chunks(500) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM vector_chunks WHERE collection = ");
            builder.push_bind(self.collection.as_str());
            builder.push(" AND chunk_id IN (");
            let mut separated = builder.separated(", ");
            for id in batch {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");

            deleted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(deleted as usize)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM vector_chunks WHERE collection = ?1")
                .bind(&self.collection)
                .fetch_one(&self.pool)
                .await?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_store(dir: &tempfile::TempDir, collection: &str) -> SqliteVectorStore {
        SqliteVectorStore::with_path(dir.path().join("vectors.db"), collection)
            .await
            .unwrap()
    }

    fn record(id: &str, source: &str, content: &str, embedding: Vec<f32>) -> ChunkRecord {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!(source));
        ChunkRecord {
            chunk_id: id.to_string(),
            source: source.to_string(),
            content: content.to_string(),
            metadata,
            embedding,
        }
    }

    #[tokio::test]
    async fn upsert_and_query_orders_by_distance() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "legal").await;

        store
            .upsert(vec![
                record("far", "a.txt", "far away", vec![0.0, 1.0]),
                record("near", "a.txt", "close by", vec![1.0, 0.1]),
                record("exact", "b.txt", "exact match", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 3);

        let results = store.query(&[1.0, 0.0], 2, None).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["exact match", "close by"]);
        assert!(results[0].distance.abs() < 1e-6);
        assert_eq!(results[0].metadata["source"], json!("b.txt"));
    }

    #[tokio::test]
    async fn rows_with_other_dimensions_are_not_scored() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "legal").await;

        store
            .upsert(vec![
                record("wide", "a.txt", "three dims", vec![1.0, 0.0, 0.0]),
                record("match", "a.txt", "two dims", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let results = store.query(&[1.0, 0.0], 5, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "two dims");
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "legal").await;

        store
            .upsert(vec![
                record("first", "a.txt", "first", vec![1.0, 0.0]),
                record("second", "a.txt", "second", vec![2.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.query(&[1.0, 0.0], 5, None).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn source_filter_restricts_results() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "legal").await;

        store
            .upsert(vec![
                record("a1", "a.txt", "from a", vec![1.0, 0.0]),
                record("b1", "b.txt", "from b", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let only_b = vec!["b.txt".to_string()];
        let results = store.query(&[1.0, 0.0], 5, Some(&only_b)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "from b");

        let no_filter: Vec<String> = Vec::new();
        let results = store.query(&[1.0, 0.0], 5, Some(&no_filter)).await.unwrap();
        assert_eq!(results.len(), 2);

        let chunks = store.get_all(Some(&only_b)).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, "b1");
    }

    #[tokio::test]
    async fn upsert_replaces_existing_chunk_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "legal").await;

        store
            .upsert(vec![record("c1", "a.txt", "old", vec![1.0])])
            .await
            .unwrap();
        store
            .upsert(vec![record("c1", "a.txt", "new", vec![1.0])])
            .await
            .unwrap();

        let chunks = store.get_all(None).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "new");
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let legal = test_store(&dir, "legal").await;
        let ghost = SqliteVectorStore::from_pool(legal.pool().clone(), "ghost")
            .await
            .unwrap();

        legal
            .upsert(vec![record("c1", "a.txt", "contract", vec![1.0])])
            .await
            .unwrap();

        assert_eq!(legal.count().await.unwrap(), 1);
        assert_eq!(ghost.count().await.unwrap(), 0);
        assert!(ghost.query(&[1.0], 3, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_by_ids_counts_removed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "legal").await;

        store
            .upsert(vec![
                record("c1", "a.txt", "one", vec![1.0]),
                record("c2", "a.txt", "two", vec![1.0]),
            ])
            .await
            .unwrap();

        let removed = store
            .delete_by_ids(&["c1".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.delete_by_ids(&[]).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
