//! Task queue repository implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use tokio::sync::Notify;
use uuid::Uuid;

use talentflow_core::{
    new_v7, Error, QueueStats, Result, Task, TaskRepository, TaskStatus, TaskType,
};

/// PostgreSQL implementation of TaskRepository.
pub struct PgTaskRepository {
    pool: Pool<Postgres>,
    /// Notify handle for event-driven worker wake.
    notify: Arc<Notify>,
}

impl PgTaskRepository {
    /// Create a new PgTaskRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Create a new PgTaskRepository sharing an existing notify handle.
    pub fn with_notify(pool: Pool<Postgres>, notify: Arc<Notify>) -> Self {
        Self { pool, notify }
    }

    /// Get the task notification handle for event-driven waking.
    pub fn task_notify(&self) -> Arc<Notify> {
        self.notify.clone()
    }

    /// Convert TaskType to string for database.
    fn task_type_to_str(task_type: TaskType) -> &'static str {
        match task_type {
            TaskType::CandidateExtraction => "candidate_extraction",
            TaskType::MatchingEvaluation => "matching_evaluation",
        }
    }

    /// Convert string from database to TaskType.
    fn str_to_task_type(s: &str) -> TaskType {
        match s {
            "candidate_extraction" => TaskType::CandidateExtraction,
            "matching_evaluation" => TaskType::MatchingEvaluation,
            _ => TaskType::MatchingEvaluation, // fallback
        }
    }

    /// Convert TaskStatus to string for database.
    #[allow(dead_code)]
    fn task_status_to_str(status: TaskStatus) -> &'static str {
        match status {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Convert string from database to TaskStatus.
    fn str_to_task_status(s: &str) -> TaskStatus {
        match s {
            "pending" => TaskStatus::Pending,
            "running" => TaskStatus::Running,
            "completed" => TaskStatus::Completed,
            "failed" => TaskStatus::Failed,
            "cancelled" => TaskStatus::Cancelled,
            _ => TaskStatus::Pending, // fallback
        }
    }

    /// Parse a task row into a Task struct.
    fn parse_task_row(row: sqlx::postgres::PgRow) -> Task {
        Task {
            id: row.get("id"),
            matching_id: row.get("matching_id"),
            task_type: Self::str_to_task_type(row.get("task_type")),
            status: Self::str_to_task_status(row.get("status")),
            priority: row.get("priority"),
            payload: row.get("payload"),
            result: row.get("result"),
            error_message: row.get("error_message"),
            progress_percent: row.get("progress_percent"),
            progress_message: row.get("progress_message"),
            retry_count: row.get("retry_count"),
            max_retries: row.get("max_retries"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
        }
    }
}

const TASK_COLUMNS: &str = "id, matching_id, task_type::text, status::text, priority, payload, \
                            result, error_message, progress_percent, progress_message, \
                            retry_count, max_retries, created_at, started_at, completed_at";

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn queue(
        &self,
        task_type: TaskType,
        matching_id: Option<Uuid>,
        payload: Option<JsonValue>,
        priority: i32,
    ) -> Result<Uuid> {
        let task_id = new_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO task_queue (id, matching_id, task_type, status, priority, payload, created_at)
             VALUES ($1, $2, $3::task_type, 'pending'::task_status, $4, $5, $6)",
        )
        .bind(task_id)
        .bind(matching_id)
        .bind(Self::task_type_to_str(task_type))
        .bind(priority)
        .bind(&payload)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        self.notify.notify_waiters();
        Ok(task_id)
    }

    async fn queue_deduplicated(
        &self,
        task_type: TaskType,
        matching_id: Uuid,
        payload: Option<JsonValue>,
        priority: i32,
    ) -> Result<Option<Uuid>> {
        let task_id = new_v7();
        let now = Utc::now();

        // Atomic check-and-insert using INSERT ... WHERE NOT EXISTS so that
        // concurrent sweeps cannot queue the same matching twice.
        let result = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO task_queue (id, matching_id, task_type, status, priority, payload, created_at)
             SELECT $1, $2, $3::task_type, 'pending'::task_status, $4, $5, $6
             WHERE NOT EXISTS (
                 SELECT 1 FROM task_queue
                 WHERE matching_id = $2 AND task_type = $3::task_type
                   AND status IN ('pending'::task_status, 'running'::task_status)
             )
             RETURNING id",
        )
        .bind(task_id)
        .bind(matching_id)
        .bind(Self::task_type_to_str(task_type))
        .bind(priority)
        .bind(&payload)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.is_some() {
            self.notify.notify_waiters();
        }
        Ok(result)
    }

    async fn claim_next(&self, task_types: &[TaskType]) -> Result<Option<Task>> {
        let now = Utc::now();
        let type_strings: Vec<String> = task_types
            .iter()
            .map(|tt| Self::task_type_to_str(*tt).to_string())
            .collect();

        // FOR UPDATE SKIP LOCKED so concurrent workers never claim the same
        // row. Type filter applies before locking; empty array claims any type.
        let query = format!(
            "UPDATE task_queue
             SET status = 'running'::task_status, started_at = $1
             WHERE id = (
                 SELECT id FROM task_queue
                 WHERE status = 'pending'::task_status
                   AND (cardinality($2::text[]) = 0 OR task_type::text = ANY($2))
                 ORDER BY priority DESC, created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {TASK_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(now)
            .bind(&type_strings)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(Self::parse_task_row))
    }

    async fn get(&self, task_id: Uuid) -> Result<Task> {
        let query = format!("SELECT {TASK_COLUMNS} FROM task_queue WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::parse_task_row)
            .ok_or_else(|| Error::NotFound(format!("task {}", task_id)))
    }

    async fn update_progress(&self, task_id: Uuid, percent: i32, message: Option<&str>) -> Result<()> {
        sqlx::query(
            "UPDATE task_queue SET progress_percent = $1, progress_message = $2 WHERE id = $3",
        )
        .bind(percent)
        .bind(message)
        .bind(task_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn complete(&self, task_id: Uuid, result: Option<JsonValue>) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            "UPDATE task_queue
             SET status = 'completed'::task_status, completed_at = $1, result = $2,
                 progress_percent = 100
             WHERE id = $3",
        )
        .bind(now)
        .bind(&result)
        .bind(task_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn fail(&self, task_id: Uuid, error: &str) -> Result<()> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let (retry_count, max_retries): (i32, i32) =
            sqlx::query_as("SELECT retry_count, max_retries FROM task_queue WHERE id = $1")
                .bind(task_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;

        if retry_count < max_retries {
            // Retry: reset to pending with incremented retry count
            sqlx::query(
                "UPDATE task_queue
                 SET status = 'pending'::task_status, retry_count = $1, error_message = $2,
                     started_at = NULL, progress_percent = 0, progress_message = NULL
                 WHERE id = $3",
            )
            .bind(retry_count + 1)
            .bind(error)
            .bind(task_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        } else {
            // Max retries exceeded: mark as failed
            sqlx::query(
                "UPDATE task_queue
                 SET status = 'failed'::task_status, completed_at = $1, error_message = $2
                 WHERE id = $3",
            )
            .bind(now)
            .bind(error)
            .bind(task_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn pending_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM task_queue WHERE status = 'pending'::task_status",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(count)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) FILTER (WHERE status = 'pending') as pending,
                COUNT(*) FILTER (WHERE status = 'running') as processing,
                COUNT(*) FILTER (WHERE status = 'completed' AND completed_at > NOW() - INTERVAL '1 hour') as completed_last_hour,
                COUNT(*) FILTER (WHERE status = 'failed' AND completed_at > NOW() - INTERVAL '1 hour') as failed_last_hour,
                COUNT(*) as total
             FROM task_queue"
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(QueueStats {
            pending: row.get::<i64, _>("pending"),
            processing: row.get::<i64, _>("processing"),
            completed_last_hour: row.get::<i64, _>("completed_last_hour"),
            failed_last_hour: row.get::<i64, _>("failed_last_hour"),
            total: row.get::<i64, _>("total"),
        })
    }

    async fn cleanup(&self, older_than_hours: i64) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM task_queue
             WHERE status IN ('completed'::task_status, 'failed'::task_status, 'cancelled'::task_status)
               AND completed_at < NOW() - ($1 || ' hours')::interval",
        )
        .bind(older_than_hours.to_string())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }
}
