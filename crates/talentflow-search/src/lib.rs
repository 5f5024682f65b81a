//! # talentflow-search
//!
//! Semantic retrieval for the matching pipeline.
//!
//! Two retrieval modes share this crate:
//! - **Job search**: candidate attributes become weighted query fragments
//!   over embedded posting chunks, thresholded and refined by the LLM.
//! - **Rubric retrieval**: best-chunk-per-rubric grouping, fixed counts
//!   matched to the scoring weight tables.

pub mod aggregator;
pub mod job_search;
pub mod rubric_search;
pub mod weights;

pub use aggregator::{filter_relevant, ScoreAccumulator};
pub use job_search::{candidate_fragments, JobSearchEngine, QueryFragment, CHUNKS_PER_FRAGMENT};
pub use rubric_search::{
    top_rubrics, RubricRetriever, CV_RUBRIC_COUNT, PROJECT_RUBRIC_COUNT,
};
pub use weights::{section_weight, FALLBACK_SECTION_WEIGHT, RELEVANCE_THRESHOLD};
