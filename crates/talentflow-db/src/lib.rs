//! # talentflow-db
//!
//! PostgreSQL database layer for talentflow.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for all core entities
//! - Vector search over job posting chunks with pgvector
//! - The durable background task queue
//! - Filesystem storage for uploaded candidate documents
//!
//! ## Example
//!
//! ```rust,ignore
//! use talentflow_db::Database;
//! use talentflow_core::MatchingRepository;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/talentflow").await?;
//!     let pending = db.matchings.list_created().await?;
//!     println!("{} matchings awaiting evaluation", pending.len());
//!     Ok(())
//! }
//! ```

pub mod candidates;
pub mod chunking;
pub mod chunks;
pub mod documents;
pub mod indexing;
pub mod job_postings;
pub mod matchings;
pub mod pool;
pub mod rubrics;
pub mod tasks;

// Test fixtures for integration tests
pub mod test_fixtures;

// Re-export core types
pub use talentflow_core::*;

// Re-export chunking types
pub use chunking::{Chunk, Chunker, ChunkerConfig, SentenceChunker};

// Re-export repository implementations
pub use candidates::PgCandidateRepository;
pub use chunks::PgChunkRepository;
pub use documents::{compute_content_hash, generate_storage_path, FilesystemStore};
pub use indexing::JobPostingIndexer;
pub use job_postings::PgJobPostingRepository;
pub use matchings::PgMatchingRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use rubrics::PgRubricRepository;
pub use tasks::PgTaskRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Candidate repository.
    pub candidates: PgCandidateRepository,
    /// Job posting repository.
    pub job_postings: PgJobPostingRepository,
    /// Job chunk repository for vector search.
    pub chunks: PgChunkRepository,
    /// Rubric repository.
    pub rubrics: PgRubricRepository,
    /// Matching repository driving the state machine.
    pub matchings: PgMatchingRepository,
    /// Task queue repository for background processing.
    pub tasks: PgTaskRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            candidates: PgCandidateRepository::new(pool.clone()),
            job_postings: PgJobPostingRepository::new(pool.clone()),
            chunks: PgChunkRepository::new(pool.clone()),
            rubrics: PgRubricRepository::new(pool.clone()),
            matchings: PgMatchingRepository::new(pool.clone()),
            tasks: PgTaskRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
