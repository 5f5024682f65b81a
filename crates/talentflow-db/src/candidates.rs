//! Candidate repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use talentflow_core::{
    new_v7, Candidate, CandidateDetails, CandidateProfile, CandidateRepository, Error, Experience,
    Project, ProjectDraft, Result,
};

/// PostgreSQL implementation of CandidateRepository.
pub struct PgCandidateRepository {
    pool: Pool<Postgres>,
}

impl PgCandidateRepository {
    /// Create a new PgCandidateRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_candidate_row(row: sqlx::postgres::PgRow) -> Candidate {
        Candidate {
            id: row.get("id"),
            name: row.get("name"),
            job_title: row.get("job_title"),
            summary_profile: row.get("summary_profile"),
            skills: row.get("skills"),
            soft_skills: row.get("soft_skills"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            deleted_at: row.get("deleted_at"),
        }
    }
}

#[async_trait]
impl CandidateRepository for PgCandidateRepository {
    async fn insert_with_details(
        &self,
        candidate_id: Uuid,
        profile: &CandidateProfile,
        projects: &[ProjectDraft],
    ) -> Result<Uuid> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // The id is assigned at upload time and carried through the task
        // payload. A retried task re-runs this insert; ON CONFLICT turns
        // that into a no-op instead of a duplicate candidate.
        let inserted = sqlx::query(
            "INSERT INTO candidate
                 (id, name, job_title, summary_profile, skills, soft_skills, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(candidate_id)
        .bind(&profile.name)
        .bind(&profile.job_title)
        .bind(&profile.summary_profile)
        .bind(&profile.skills)
        .bind(&profile.soft_skills)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await.map_err(Error::Database)?;
            return Ok(candidate_id);
        }

        for exp in &profile.experiences {
            sqlx::query(
                "INSERT INTO experience
                     (id, candidate_id, date_start, date_end, company, position, description)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(new_v7())
            .bind(candidate_id)
            .bind(&exp.date_start)
            .bind(&exp.date_end)
            .bind(&exp.company)
            .bind(&exp.position)
            .bind(&exp.description)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        for project in projects {
            sqlx::query(
                "INSERT INTO project
                     (id, candidate_id, name, company, date_start, date_end, position, description, skills)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(new_v7())
            .bind(candidate_id)
            .bind(&project.name)
            .bind(&project.company)
            .bind(&project.date_start)
            .bind(&project.date_end)
            .bind(&project.position)
            .bind(&project.description)
            .bind(&project.skills)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(candidate_id)
    }

    async fn fetch(&self, id: Uuid) -> Result<CandidateDetails> {
        let row = sqlx::query(
            "SELECT id, name, job_title, summary_profile, skills, soft_skills,
                    created_at, updated_at, deleted_at
             FROM candidate WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let candidate = row
            .map(Self::parse_candidate_row)
            .ok_or(Error::CandidateNotFound(id))?;

        let experiences = sqlx::query(
            "SELECT id, candidate_id, date_start, date_end, company, position, description
             FROM experience WHERE candidate_id = $1
             ORDER BY id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?
        .into_iter()
        .map(|row| Experience {
            id: row.get("id"),
            candidate_id: row.get("candidate_id"),
            date_start: row.get("date_start"),
            date_end: row.get("date_end"),
            company: row.get("company"),
            position: row.get("position"),
            description: row.get("description"),
        })
        .collect();

        let projects = sqlx::query(
            "SELECT id, candidate_id, name, company, date_start, date_end, position, description, skills
             FROM project WHERE candidate_id = $1
             ORDER BY id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?
        .into_iter()
        .map(|row| Project {
            id: row.get("id"),
            candidate_id: row.get("candidate_id"),
            name: row.get("name"),
            company: row.get("company"),
            date_start: row.get("date_start"),
            date_end: row.get("date_end"),
            position: row.get("position"),
            description: row.get("description"),
            skills: row.get("skills"),
        })
        .collect();

        Ok(CandidateDetails {
            candidate,
            experiences,
            projects,
        })
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM candidate WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE candidate SET deleted_at = $1, updated_at = $1
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::CandidateNotFound(id));
        }
        Ok(())
    }
}
