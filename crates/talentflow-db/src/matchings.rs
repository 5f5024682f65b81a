//! Matching repository implementation.
//!
//! All status transitions run as conditional UPDATEs that include the
//! expected current status in the WHERE clause, so the state machine is
//! enforced at the row level even under concurrent workers.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use talentflow_core::{
    new_v7, Error, EvaluationView, Matching, MatchingRepository, MatchingResult, MatchingStatus,
    ResultDraft, Result,
};

/// PostgreSQL implementation of MatchingRepository.
pub struct PgMatchingRepository {
    pool: Pool<Postgres>,
}

impl PgMatchingRepository {
    /// Create a new PgMatchingRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn status_to_str(status: MatchingStatus) -> &'static str {
        status.as_str()
    }

    fn str_to_status(s: &str) -> MatchingStatus {
        match s {
            "created" => MatchingStatus::Created,
            "queued" => MatchingStatus::Queued,
            "processing" => MatchingStatus::Processing,
            "completed" => MatchingStatus::Completed,
            "error" => MatchingStatus::Error,
            _ => MatchingStatus::Created, // fallback
        }
    }

    fn parse_matching_row(row: sqlx::postgres::PgRow) -> Matching {
        Matching {
            id: row.get("id"),
            job_posting_id: row.get("job_posting_id"),
            candidate_id: row.get("candidate_id"),
            status: Self::str_to_status(row.get("status")),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            finished_at: row.get("finished_at"),
        }
    }

    fn parse_result_row(row: sqlx::postgres::PgRow) -> MatchingResult {
        MatchingResult {
            id: row.get("id"),
            matching_id: row.get("matching_id"),
            cv_match_rate: row.get("cv_match_rate"),
            cv_feedback: row.get("cv_feedback"),
            project_score: row.get("project_score"),
            project_feedback: row.get("project_feedback"),
            overall_summary: row.get("overall_summary"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl MatchingRepository for PgMatchingRepository {
    async fn insert_bulk(
        &self,
        candidate_id: Uuid,
        job_posting_ids: &[Uuid],
    ) -> Result<Vec<Uuid>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut ids = Vec::with_capacity(job_posting_ids.len());

        for job_posting_id in job_posting_ids {
            let id = new_v7();
            sqlx::query(
                "INSERT INTO matching (id, job_posting_id, candidate_id, status, created_at, updated_at)
                 VALUES ($1, $2, $3, 'created'::matching_status, $4, $4)",
            )
            .bind(id)
            .bind(job_posting_id)
            .bind(candidate_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            ids.push(id);
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(ids)
    }

    async fn get(&self, id: Uuid) -> Result<Matching> {
        let row = sqlx::query(
            "SELECT id, job_posting_id, candidate_id, status::text, created_at, updated_at, finished_at
             FROM matching WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_matching_row)
            .ok_or(Error::MatchingNotFound(id))
    }

    async fn list_created(&self) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM matching
             WHERE status = 'created'::matching_status
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(ids)
    }

    async fn mark_queued(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let now = Utc::now();

        // Conditional on 'created' so rows concurrently promoted by another
        // sweep are skipped rather than rewound.
        let moved: Vec<Uuid> = sqlx::query_scalar(
            "UPDATE matching
             SET status = 'queued'::matching_status, updated_at = $1
             WHERE id = ANY($2) AND status = 'created'::matching_status
             RETURNING id",
        )
        .bind(now)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(moved)
    }

    async fn begin_processing(&self, id: Uuid) -> Result<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE matching
             SET status = 'processing'::matching_status, updated_at = $1
             WHERE id = $2 AND status = 'queued'::matching_status",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() == 1)
    }

    async fn complete(&self, id: Uuid, draft: &ResultDraft) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let updated = sqlx::query(
            "UPDATE matching
             SET status = 'completed'::matching_status, updated_at = $1, finished_at = $1
             WHERE id = $2 AND status = 'processing'::matching_status",
        )
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() != 1 {
            return Err(Error::Task(format!(
                "matching {} not in processing, cannot complete",
                id
            )));
        }

        // ON CONFLICT DO NOTHING keeps a lost duplicate from clobbering the
        // result a prior delivery already wrote.
        sqlx::query(
            "INSERT INTO matching_result
                 (id, matching_id, cv_match_rate, cv_feedback, project_score,
                  project_feedback, overall_summary, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (matching_id) DO NOTHING",
        )
        .bind(new_v7())
        .bind(id)
        .bind(draft.cv_match_rate)
        .bind(&draft.cv_feedback)
        .bind(draft.project_score)
        .bind(&draft.project_feedback)
        .bind(&draft.overall_summary)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn mark_error(&self, id: Uuid) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            "UPDATE matching
             SET status = 'error'::matching_status, updated_at = $1, finished_at = $1
             WHERE id = $2 AND status = 'processing'::matching_status",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn evaluation(&self, id: Uuid) -> Result<EvaluationView> {
        let matching = self.get(id).await?;

        let result = if matching.status == MatchingStatus::Completed {
            let row = sqlx::query(
                "SELECT id, matching_id, cv_match_rate, cv_feedback, project_score,
                        project_feedback, overall_summary, created_at
                 FROM matching_result WHERE matching_id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

            row.map(Self::parse_result_row)
        } else {
            None
        };

        Ok(EvaluationView {
            id: matching.id,
            status: matching.status,
            result,
        })
    }
}
