//! Core traits for talentflow abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// CANDIDATE REPOSITORY
// =============================================================================

/// Repository for candidate persistence.
#[async_trait]
pub trait CandidateRepository: Send + Sync {
    /// Insert a candidate with its experiences and projects in a single
    /// transaction under a caller-assigned id. Either everything lands or
    /// nothing does. Re-running with an id that already exists is a no-op,
    /// so a retried extraction task never duplicates the candidate.
    async fn insert_with_details(
        &self,
        id: Uuid,
        profile: &CandidateProfile,
        projects: &[ProjectDraft],
    ) -> Result<Uuid>;

    /// Fetch a candidate with its experiences and projects.
    async fn fetch(&self, id: Uuid) -> Result<CandidateDetails>;

    /// Check whether a non-deleted candidate exists.
    async fn exists(&self, id: Uuid) -> Result<bool>;

    /// Soft-delete a candidate.
    async fn soft_delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// JOB POSTING REPOSITORY
// =============================================================================

/// Request for creating a job posting (seeding/administration).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateJobPosting {
    pub title: String,
    pub intro: Option<String>,
    pub work: Option<String>,
    pub skills: Option<String>,
    pub qualification: Option<String>,
    pub culture: Option<String>,
    pub other: Option<String>,
}

/// Repository for job postings.
#[async_trait]
pub trait JobPostingRepository: Send + Sync {
    /// Insert a new posting. Returns the new posting ID.
    async fn insert(&self, req: CreateJobPosting) -> Result<Uuid>;

    /// Fetch a single posting by ID.
    async fn get(&self, id: Uuid) -> Result<JobPosting>;

    /// Fetch multiple postings, preserving the order of `ids`.
    /// Unknown IDs are skipped.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<JobPosting>>;

    /// List all postings.
    async fn list(&self) -> Result<Vec<JobPosting>>;
}

// =============================================================================
// CHUNK REPOSITORY
// =============================================================================

/// A chunk ready for insertion, before an ID is assigned.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub section: String,
    pub chunk_index: i32,
    pub content: String,
    pub embedding: Vector,
}

/// Repository for embedded job posting chunks.
#[async_trait]
pub trait ChunkRepository: Send + Sync {
    /// Replace all chunks for a posting with a freshly embedded set.
    async fn store_for_posting(&self, job_posting_id: Uuid, chunks: Vec<NewChunk>) -> Result<u64>;

    /// Nearest-neighbor search over all chunks. Returns up to `limit`
    /// hits ordered by similarity descending.
    async fn search(&self, query: &Vector, limit: i64) -> Result<Vec<ChunkHit>>;

    /// Count chunks for a posting.
    async fn count_for_posting(&self, job_posting_id: Uuid) -> Result<i64>;
}

// =============================================================================
// RUBRIC REPOSITORY
// =============================================================================

/// Repository for rubric definitions and similarity queries.
#[async_trait]
pub trait RubricRepository: Send + Sync {
    /// List all rubrics of one kind.
    async fn list(&self, kind: RubricKind) -> Result<Vec<Rubric>>;

    /// Compute rubric×chunk cosine similarities for one posting,
    /// one row per (rubric, chunk) pair. Grouping to the best chunk
    /// per rubric happens in the retrieval layer.
    async fn similarities_for_posting(
        &self,
        job_posting_id: Uuid,
        kind: RubricKind,
    ) -> Result<Vec<RubricMatch>>;
}

// =============================================================================
// MATCHING REPOSITORY
// =============================================================================

/// Repository driving the matching state machine.
///
/// Every transition method enforces the state machine at the SQL level;
/// callers never write a status column directly.
#[async_trait]
pub trait MatchingRepository: Send + Sync {
    /// Insert one `created` matching per job posting for a candidate.
    /// Returns the new matching IDs in input order.
    async fn insert_bulk(&self, candidate_id: Uuid, job_posting_ids: &[Uuid]) -> Result<Vec<Uuid>>;

    /// Fetch a matching by ID.
    async fn get(&self, id: Uuid) -> Result<Matching>;

    /// List IDs of all matchings still in `created`.
    async fn list_created(&self) -> Result<Vec<Uuid>>;

    /// Promote the given matchings from `created` to `queued`.
    /// Rows no longer in `created` are skipped; returns the IDs that
    /// actually moved.
    async fn mark_queued(&self, ids: &[Uuid]) -> Result<Vec<Uuid>>;

    /// Attempt the `queued → processing` transition. Returns `false`
    /// when the row was not in `queued`, which signals a duplicate
    /// delivery that must be dropped.
    async fn begin_processing(&self, id: Uuid) -> Result<bool>;

    /// Persist the result and move `processing → completed` in one
    /// transaction.
    async fn complete(&self, id: Uuid, draft: &ResultDraft) -> Result<()>;

    /// Move `processing → error`.
    async fn mark_error(&self, id: Uuid) -> Result<()>;

    /// Fetch the status plus result (when completed) for one matching.
    async fn evaluation(&self, id: Uuid) -> Result<EvaluationView>;
}

// =============================================================================
// TASK REPOSITORY
// =============================================================================

/// Repository for the durable background task queue.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Queue a new task. Returns the task ID.
    async fn queue(
        &self,
        task_type: TaskType,
        matching_id: Option<Uuid>,
        payload: Option<JsonValue>,
        priority: i32,
    ) -> Result<Uuid>;

    /// Queue a task targeting a matching unless an equivalent task is
    /// already pending or running. Returns `None` when deduplicated.
    async fn queue_deduplicated(
        &self,
        task_type: TaskType,
        matching_id: Uuid,
        payload: Option<JsonValue>,
        priority: i32,
    ) -> Result<Option<Uuid>>;

    /// Atomically claim the next pending task of the given types.
    /// Concurrent workers never claim the same row.
    async fn claim_next(&self, task_types: &[TaskType]) -> Result<Option<Task>>;

    /// Fetch a task by ID.
    async fn get(&self, id: Uuid) -> Result<Task>;

    /// Update progress on a running task.
    async fn update_progress(&self, id: Uuid, percent: i32, message: Option<&str>) -> Result<()>;

    /// Mark a task completed with an optional result payload.
    async fn complete(&self, id: Uuid, result: Option<JsonValue>) -> Result<()>;

    /// Record a failure. Re-queues the task when retries remain,
    /// otherwise marks it failed.
    async fn fail(&self, id: Uuid, error: &str) -> Result<()>;

    /// Number of pending tasks.
    async fn pending_count(&self) -> Result<i64>;

    /// Aggregate queue statistics.
    async fn stats(&self) -> Result<QueueStats>;

    /// Delete completed/failed tasks older than the given age.
    /// Returns the number of rows removed.
    async fn cleanup(&self, older_than_hours: i64) -> Result<u64>;
}

// =============================================================================
// DOCUMENT STORE
// =============================================================================

/// Content-addressed storage for uploaded candidate documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a document, returning its relative storage path.
    async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<String>;

    /// Read a stored document back by its relative path.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;
}

// =============================================================================
// INFERENCE BACKENDS
// =============================================================================

/// Backend capable of producing text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a batch of texts. Returns one vector per input, in order.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimensionality of the vectors this backend produces.
    fn dimension(&self) -> usize;

    /// Model identifier, for logging.
    fn embed_model(&self) -> &str;
}

/// Backend capable of text generation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion for a plain prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with an explicit system prompt.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate a JSON document constrained by the model's JSON mode.
    /// Implementations must return parsed JSON or an error.
    async fn generate_json_with_system(&self, system: &str, prompt: &str) -> Result<JsonValue>;

    /// Model identifier, for logging.
    fn gen_model(&self) -> &str;
}

/// Full inference backend: embeddings plus generation plus liveness.
#[async_trait]
pub trait InferenceBackend: EmbeddingBackend + GenerationBackend {
    /// Check that the backend is reachable and serving.
    async fn health_check(&self) -> Result<()>;
}
