//! Postgres + pgvector backed vector store
//!
//! Delegates nearest-neighbor search to the `<=>` cosine distance
//! operator over a vector column. Ranking matches the in-memory store:
//! similarity descending, ties broken by ascending sequence index, so
//! both backends return the same ordered chunk ids for the same data.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use pgvector::Vector;
use tokio_postgres::{Client, NoTls};
use uuid::Uuid;

use crate::config::VectorDbConfig;
use crate::error::{Result, VectorStoreError};
use crate::types::Chunk;

use super::{rank_results, RetrievalResult, VectorStore};

/// Vector store over a pgvector table
pub struct PgVectorStore {
    client: Client,
    table: String,
    dimensions: usize,
    timeout: Duration,
}

impl PgVectorStore {
    /// Connect and make sure the extension and table exist
    pub async fn connect(
        config: &VectorDbConfig,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(&config.connection_string, NoTls)
            .await
            .map_err(|e| VectorStoreError::Backend(format!("connection failed: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("postgres connection error: {e}");
            }
        });

        let store = Self {
            client,
            table: config.table_name.clone(),
            dimensions,
            timeout,
        };
        store.ensure_schema().await?;

        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.run(self.client.execute("CREATE EXTENSION IF NOT EXISTS vector", &[]))
            .await?;

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                chunk_id UUID PRIMARY KEY,
                doc_id UUID NOT NULL,
                sequence_index BIGINT NOT NULL,
                page_number BIGINT,
                text TEXT NOT NULL,
                token_count BIGINT NOT NULL,
                embedding VECTOR({}) NOT NULL
            )",
            self.table, self.dimensions
        );
        self.run(self.client.execute(&ddl, &[])).await?;

        Ok(())
    }

    /// Run a database future under the configured timeout.
    ///
    /// A timeout is a retryable backend error, never a partial result.
    async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, tokio_postgres::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(VectorStoreError::from(e).into()),
            Err(_) => Err(VectorStoreError::Backend(format!(
                "query timed out after {:?}",
                self.timeout
            ))
            .into()),
        }
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimensions {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimensions,
                actual,
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            self.check_dimension(chunk.embedding.len())?;
        }

        let sql = format!(
            "INSERT INTO {} \
                (chunk_id, doc_id, sequence_index, page_number, text, token_count, embedding) \
                VALUES ($1, $2, $3, $4, $5, $6, $7) \
                ON CONFLICT (chunk_id) DO UPDATE SET \
                    doc_id = EXCLUDED.doc_id, \
                    sequence_index = EXCLUDED.sequence_index, \
                    page_number = EXCLUDED.page_number, \
                    text = EXCLUDED.text, \
                    token_count = EXCLUDED.token_count, \
                    embedding = EXCLUDED.embedding",
            self.table
        );
        let statement = self.run(self.client.prepare(&sql)).await?;

        for chunk in chunks {
            let embedding = Vector::from(chunk.embedding.clone());
            let sequence_index = chunk.sequence_index as i64;
            let page_number = chunk.page_number.map(|p| p as i64);
            let token_count = chunk.token_count as i64;

            self.run(self.client.execute(
                &statement,
                &[
                    &chunk.id,
                    &chunk.doc_id,
                    &sequence_index,
                    &page_number,
                    &chunk.text,
                    &token_count,
                    &embedding,
                ],
            ))
            .await?;
        }

        tracing::debug!(count = chunks.len(), table = %self.table, "upserted chunks");
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<RetrievalResult>> {
        self.check_dimension(query.len())?;

        if self.is_empty().await? {
            return Err(VectorStoreError::EmptyIndex.into());
        }

        let sql = format!(
            "SELECT chunk_id, doc_id, sequence_index, page_number, text, token_count, \
                    1 - (embedding <=> $1) AS similarity \
             FROM {} \
             WHERE 1 - (embedding <=> $1) >= $2 \
             ORDER BY embedding <=> $1 ASC, sequence_index ASC \
             LIMIT $3",
            self.table
        );

        let embedding = Vector::from(query.to_vec());
        // Cosine similarity never drops below -1, so an absent
        // threshold becomes a predicate that always passes
        let min_similarity = threshold.unwrap_or(-2.0) as f64;
        let limit = top_k as i64;

        let rows = self
            .run(
                self.client
                    .query(&sql, &[&embedding, &min_similarity, &limit]),
            )
            .await?;

        let scored: Vec<(Chunk, f32)> = rows
            .iter()
            .map(|row| {
                let chunk = Chunk {
                    id: row.get::<_, Uuid>(0),
                    doc_id: row.get::<_, Uuid>(1),
                    sequence_index: row.get::<_, i64>(2) as u32,
                    text: row.get::<_, String>(4),
                    token_count: row.get::<_, i64>(5) as usize,
                    page_number: row.get::<_, Option<i64>>(3).map(|p| p as u32),
                    embedding: Vec::new(),
                };
                let similarity = row.get::<_, f64>(6) as f32;
                (chunk, similarity)
            })
            .collect();

        // The query already ordered and limited; ranking again assigns
        // ranks and keeps the tie rule identical to the memory store
        Ok(rank_results(scored, top_k, None))
    }

    async fn len(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let row = self.run(self.client.query_one(&sql, &[])).await?;
        Ok(row.get::<_, i64>(0) as usize)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.run(self.client.query_one("SELECT 1", &[])).await.is_ok())
    }

    fn name(&self) -> &str {
        "pgvector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryVectorStore;

    fn chunk(sequence_index: u32, embedding: Vec<f32>) -> Chunk {
        Chunk::new(
            Uuid::from_u128(42),
            sequence_index,
            format!("parity chunk {sequence_index}"),
            3,
            Some(1),
        )
        .with_embedding(embedding)
    }

    /// Parity between the two store variants over the same chunk set.
    ///
    /// Needs a reachable Postgres with pgvector; run with
    /// `PASSAGE_PG_URL=postgres://... cargo test -- --ignored`.
    #[tokio::test]
    #[ignore = "requires a pgvector database via PASSAGE_PG_URL"]
    async fn pgvector_matches_memory_ordering() {
        let url = std::env::var("PASSAGE_PG_URL").expect("PASSAGE_PG_URL not set");
        let config = VectorDbConfig {
            connection_string: url,
            table_name: "parity_test_chunks".to_string(),
        };

        let chunks = vec![
            chunk(0, vec![1.0, 0.0, 0.0]),
            chunk(1, vec![0.6, 0.8, 0.0]),
            chunk(2, vec![0.6, 0.8, 0.0]),
            chunk(3, vec![0.0, 1.0, 0.0]),
            chunk(4, vec![0.0, 0.0, 1.0]),
        ];
        let query = [1.0, 0.1, 0.0];

        let memory = MemoryVectorStore::new(3);
        memory.upsert(&chunks).await.unwrap();
        let local = memory.search(&query, 4, Some(0.0)).await.unwrap();

        let remote_store = PgVectorStore::connect(&config, 3, Duration::from_secs(10))
            .await
            .unwrap();
        remote_store.upsert(&chunks).await.unwrap();
        let remote = remote_store.search(&query, 4, Some(0.0)).await.unwrap();

        let local_ids: Vec<Uuid> = local.iter().map(|r| r.chunk.id).collect();
        let remote_ids: Vec<Uuid> = remote.iter().map(|r| r.chunk.id).collect();
        assert_eq!(local_ids, remote_ids);

        for (a, b) in local.iter().zip(remote.iter()) {
            assert!((a.score - b.score).abs() < 1e-4);
        }
    }
}
