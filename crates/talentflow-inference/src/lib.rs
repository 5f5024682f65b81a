//! # talentflow-inference
//!
//! LLM inference backends for talentflow.
//!
//! This crate provides:
//! - Ollama implementation of the core backend traits (default)
//! - Structured extraction of candidate documents (CV, project report)
//! - Deterministic mock backend for tests (feature `mock`)
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable Ollama backend
//! - `mock`: Enable the mock backend outside of this crate's own tests
//!
//! # Example
//!
//! ```rust,no_run
//! use talentflow_inference::OllamaBackend;
//! use talentflow_core::EmbeddingBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaBackend::from_env();
//!     let texts = vec!["Hello".to_string()];
//!     let embeddings = backend.embed_texts(&texts).await.unwrap();
//! }
//! ```

pub mod extraction;

#[cfg(feature = "ollama")]
pub mod ollama;

// Mock inference backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use talentflow_core::*;

pub use extraction::CandidateExtractor;

#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockEmbeddingGenerator, MockInferenceBackend};
