//! Rubric repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use talentflow_core::{Error, Result, Rubric, RubricKind, RubricMatch, RubricRepository};

/// PostgreSQL implementation of RubricRepository.
pub struct PgRubricRepository {
    pool: Pool<Postgres>,
}

impl PgRubricRepository {
    /// Create a new PgRubricRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn str_to_kind(s: &str) -> RubricKind {
        match s {
            "project" => RubricKind::Project,
            _ => RubricKind::Cv, // fallback
        }
    }
}

#[async_trait]
impl RubricRepository for PgRubricRepository {
    async fn list(&self, kind: RubricKind) -> Result<Vec<Rubric>> {
        let rows = sqlx::query(
            "SELECT id, kind::text, parameter, description, embedding
             FROM rubric WHERE kind = $1::rubric_kind
             ORDER BY id ASC",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| Rubric {
                id: row.get("id"),
                kind: Self::str_to_kind(row.get("kind")),
                parameter: row.get("parameter"),
                description: row.get("description"),
                embedding: row.get("embedding"),
            })
            .collect())
    }

    async fn similarities_for_posting(
        &self,
        job_posting_id: Uuid,
        kind: RubricKind,
    ) -> Result<Vec<RubricMatch>> {
        // Cross join produces one row per (rubric, chunk) pair; the
        // retrieval layer reduces to the best chunk per rubric.
        let rows = sqlx::query(
            "SELECT r.id AS rubric_id, r.parameter, r.description,
                    1.0 - (c.embedding <=> r.embedding) AS similarity
             FROM rubric r
             CROSS JOIN job_chunk c
             WHERE r.kind = $1::rubric_kind AND c.job_posting_id = $2",
        )
        .bind(kind.as_str())
        .bind(job_posting_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| RubricMatch {
                rubric_id: row.get("rubric_id"),
                parameter: row.get("parameter"),
                description: row.get("description"),
                similarity: row.get::<f64, _>("similarity") as f32,
            })
            .collect())
    }
}
