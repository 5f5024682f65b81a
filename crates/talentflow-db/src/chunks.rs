//! Job chunk repository with pgvector similarity search.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use talentflow_core::{ChunkHit, ChunkRepository, Error, NewChunk, Result};

/// PostgreSQL implementation of ChunkRepository.
pub struct PgChunkRepository {
    pool: Pool<Postgres>,
}

impl PgChunkRepository {
    /// Create a new PgChunkRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChunkRepository for PgChunkRepository {
    async fn store_for_posting(
        &self,
        job_posting_id: Uuid,
        chunks: Vec<NewChunk>,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Re-chunking replaces the previous set wholesale.
        sqlx::query("DELETE FROM job_chunk WHERE job_posting_id = $1")
            .bind(job_posting_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let count = chunks.len() as u64;
        for chunk in chunks {
            sqlx::query(
                "INSERT INTO job_chunk (id, job_posting_id, section, chunk_index, content, embedding)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(talentflow_core::new_v7())
            .bind(job_posting_id)
            .bind(&chunk.section)
            .bind(chunk.chunk_index)
            .bind(&chunk.content)
            .bind(&chunk.embedding)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(count)
    }

    async fn search(&self, query: &Vector, limit: i64) -> Result<Vec<ChunkHit>> {
        // Raw top-limit chunk rows by cosine similarity. A posting may
        // appear several times; the aggregation layer sums every chunk's
        // contribution, so collapsing per posting here would skew scores.
        let rows = sqlx::query(
            "SELECT c.job_posting_id,
                    c.section,
                    1.0 - (c.embedding <=> $1::vector) AS similarity
             FROM job_chunk c
             ORDER BY c.embedding <=> $1::vector
             LIMIT $2",
        )
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| ChunkHit {
                job_posting_id: row.get("job_posting_id"),
                section: row.get("section"),
                similarity: row.get::<f64, _>("similarity") as f32,
            })
            .collect())
    }

    async fn count_for_posting(&self, job_posting_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM job_chunk WHERE job_posting_id = $1")
                .bind(job_posting_id)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(count)
    }
}
