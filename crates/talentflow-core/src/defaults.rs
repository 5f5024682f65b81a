//! Centralized default constants for the talentflow system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// CHUNKING
// =============================================================================

/// Minimum characters per chunk; shorter trailing text is merged backwards.
pub const CHUNK_MIN_SIZE: usize = 1000;

/// Maximum characters per chunk for text splitting.
pub const CHUNK_MAX_SIZE: usize = 2000;

/// Overlap characters between adjacent chunks for context preservation.
pub const CHUNK_OVERLAP: usize = 100;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default embedding model name (Ollama).
pub const EMBED_MODEL: &str = "nomic-embed-text";

/// Default embedding vector dimension for nomic-embed-text.
pub const EMBED_DIMENSION: usize = 768;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default generation model name (Ollama).
pub const GEN_MODEL: &str = "gpt-oss:20b";

/// Timeout for embedding requests in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Timeout for generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// DATABASE
// =============================================================================

/// Maximum pooled Postgres connections. The worker holds a handful open
/// during evaluation bursts; the API shares the rest.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Minimum pooled connections kept warm.
pub const DB_MIN_CONNECTIONS: u32 = 1;

/// Timeout for acquiring a connection, in seconds.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Idle connection timeout, in seconds.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

/// Maximum connection lifetime, in seconds.
pub const DB_MAX_LIFETIME_SECS: u64 = 1800;

// =============================================================================
// TASK PROCESSING
// =============================================================================

/// Default maximum retry count for failed tasks.
pub const TASK_MAX_RETRIES: i32 = 3;

/// Default maximum number of concurrently executing tasks per worker.
pub const TASK_MAX_CONCURRENT: usize = 4;

/// Hard timeout for a single task execution in seconds. Evaluation tasks
/// make several LLM round-trips, so this is generous.
pub const TASK_TIMEOUT_SECS: u64 = 600;

/// Default worker polling interval when the queue is empty, in milliseconds.
pub const TASK_POLL_INTERVAL_MS: u64 = 500;

/// Default broadcast capacity for worker events.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Maximum upload body size in bytes (10 MB covers CV + report PDFs).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default directory for stored candidate documents.
pub const UPLOAD_DIR: &str = "./uploads";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_bounds_are_consistent() {
        assert!(CHUNK_MIN_SIZE < CHUNK_MAX_SIZE);
        assert!(CHUNK_OVERLAP < CHUNK_MIN_SIZE);
    }

    #[test]
    fn test_embed_dimension_is_standard() {
        let valid_dims = [384, 768, 1536];
        assert!(valid_dims.contains(&EMBED_DIMENSION));
    }

    #[test]
    fn test_task_defaults() {
        assert_eq!(TASK_MAX_RETRIES, 3);
        assert_eq!(TASK_MAX_CONCURRENT, 4);
        assert_eq!(TASK_POLL_INTERVAL_MS, 500);
    }
}
