//! # talentflow-jobs
//!
//! Background task queue processing for talentflow.
//!
//! This crate provides:
//! - Priority-based task claiming with concurrent workers
//! - Progress tracking and notifications via broadcast channels
//! - Pipeline handlers: candidate extraction and matching evaluation
//! - The evaluation sweep that promotes `created` matchings into the queue
//!
//! ## Example
//!
//! ```ignore
//! use talentflow_jobs::{WorkerBuilder, WorkerConfig, NoOpHandler};
//! use talentflow_db::Database;
//! use talentflow_core::TaskType;
//!
//! let db = Database::connect("postgres://...").await?;
//!
//! let worker = WorkerBuilder::new(db)
//!     .with_config(WorkerConfig::default().with_poll_interval(1000))
//!     .with_handler(NoOpHandler::new(TaskType::CandidateExtraction))
//!     .build()
//!     .await;
//!
//! let handle = worker.start();
//!
//! // Graceful shutdown
//! handle.shutdown().await?;
//! ```

pub mod evaluate_handler;
pub mod extract_handler;
pub mod handler;
pub mod sweep;
pub mod worker;

// Re-export core types
pub use talentflow_core::*;

pub use evaluate_handler::EvaluationHandler;
pub use extract_handler::ExtractionHandler;
pub use handler::{NoOpHandler, TaskContext, TaskHandler, TaskResult};
pub use sweep::EvaluationSweep;
pub use worker::{TaskWorker, WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle};

/// Default maximum retries for failed tasks.
pub const DEFAULT_MAX_RETRIES: i32 = talentflow_core::defaults::TASK_MAX_RETRIES;

/// Default polling interval for task processing (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = talentflow_core::defaults::TASK_POLL_INTERVAL_MS;
