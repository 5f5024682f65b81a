//! # talentflow-scoring
//!
//! Rubric-based candidate evaluation.
//!
//! A single structured generation call scores the candidate against the
//! retrieved CV and project rubrics; fixed positional weight tables then
//! collapse the 1..=5 scores into a CV match rate in [0, 100] and a
//! project score in [0, 10].

pub mod flow;
pub mod prompt;
pub mod weights;

pub use flow::{ScoringFlow, ScoringOutput};
pub use prompt::{build_scoring_prompt, SCORING_SYSTEM_PROMPT};
pub use weights::{cv_match_rate, project_score, CV_WEIGHTS, PROJECT_WEIGHTS};
