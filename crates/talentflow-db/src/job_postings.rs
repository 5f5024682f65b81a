//! Job posting repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use chrono::Utc;

use talentflow_core::{new_v7, CreateJobPosting, Error, JobPosting, JobPostingRepository, Result};

/// PostgreSQL implementation of JobPostingRepository.
pub struct PgJobPostingRepository {
    pool: Pool<Postgres>,
}

const POSTING_COLUMNS: &str =
    "id, title, intro, work, skills, qualification, culture, other, created_at";

impl PgJobPostingRepository {
    /// Create a new PgJobPostingRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_posting_row(row: sqlx::postgres::PgRow) -> JobPosting {
        JobPosting {
            id: row.get("id"),
            title: row.get("title"),
            intro: row.get("intro"),
            work: row.get("work"),
            skills: row.get("skills"),
            qualification: row.get("qualification"),
            culture: row.get("culture"),
            other: row.get("other"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl JobPostingRepository for PgJobPostingRepository {
    async fn insert(&self, req: CreateJobPosting) -> Result<Uuid> {
        let id = new_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO job_posting
                 (id, title, intro, work, skills, qualification, culture, other, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.intro)
        .bind(&req.work)
        .bind(&req.skills)
        .bind(&req.qualification)
        .bind(&req.culture)
        .bind(&req.other)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<JobPosting> {
        let query = format!("SELECT {POSTING_COLUMNS} FROM job_posting WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::parse_posting_row)
            .ok_or(Error::JobPostingNotFound(id))
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<JobPosting>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // array_position preserves the caller's ordering; unknown IDs
        // simply produce no row.
        let query = format!(
            "SELECT {POSTING_COLUMNS} FROM job_posting
             WHERE id = ANY($1)
             ORDER BY array_position($1, id)"
        );
        let rows = sqlx::query(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_posting_row).collect())
    }

    async fn list(&self) -> Result<Vec<JobPosting>> {
        let query = format!("SELECT {POSTING_COLUMNS} FROM job_posting ORDER BY created_at ASC");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_posting_row).collect())
    }
}
