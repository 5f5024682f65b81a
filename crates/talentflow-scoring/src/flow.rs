//! Evaluation flow: one structured generation call per candidate×job
//! pairing, validated and reduced to a result draft.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

use talentflow_core::{
    CandidateDetails, Error, GenerationBackend, JobPosting, Result, ResultDraft, RubricMatch,
};

use crate::prompt::{build_scoring_prompt, SCORING_SYSTEM_PROMPT};
use crate::weights::{cv_match_rate, project_score};

/// Structured response expected from the evaluation call.
///
/// Scores are positional: `cv_scores[i]` answers the i-th CV rubric in
/// the prompt, `project_scores[i]` the i-th project rubric.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScoringOutput {
    /// Integer scores 1..=5, one per CV rubric, in prompt order.
    pub cv_scores: Vec<i64>,
    /// Integer scores 1..=5, one per project rubric, in prompt order.
    pub project_scores: Vec<i64>,
    /// Feedback on the candidate's CV against the rubrics.
    pub cv_feedback: String,
    /// Feedback on the candidate's project history against the rubrics.
    pub project_feedback: String,
    /// Overall hire/no-hire narrative.
    pub overall_summary: String,
}

fn validate_scores(label: &str, scores: &[i64]) -> Result<()> {
    for &score in scores {
        if !(1..=5).contains(&score) {
            return Err(Error::Inference(format!(
                "{label} score {score} outside 1..=5"
            )));
        }
    }
    Ok(())
}

/// Runs the scoring generation and turns its output into a result draft.
pub struct ScoringFlow {
    generator: Arc<dyn GenerationBackend>,
}

impl ScoringFlow {
    /// Create a new flow over a generation backend.
    pub fn new(generator: Arc<dyn GenerationBackend>) -> Self {
        Self { generator }
    }

    /// Evaluate one candidate against one job posting.
    ///
    /// Scores outside 1..=5 or a response that does not match the
    /// expected shape fail the evaluation outright; partial results are
    /// never synthesized from a malformed response.
    pub async fn evaluate(
        &self,
        job: &JobPosting,
        details: &CandidateDetails,
        cv_rubrics: &[RubricMatch],
        project_rubrics: &[RubricMatch],
    ) -> Result<ResultDraft> {
        let prompt = build_scoring_prompt(job, details, cv_rubrics, project_rubrics);

        let raw = self
            .generator
            .generate_json_with_system(SCORING_SYSTEM_PROMPT, &prompt)
            .await?;

        let output: ScoringOutput = serde_json::from_value(raw).map_err(|e| {
            warn!(
                subsystem = "scoring",
                component = "flow",
                op = "evaluate",
                job_posting_id = %job.id,
                candidate_id = %details.candidate.id,
                error = %e,
                "Scoring response did not match expected shape"
            );
            Error::Inference(format!("malformed scoring response: {e}"))
        })?;

        validate_scores("cv", &output.cv_scores)?;
        validate_scores("project", &output.project_scores)?;

        let draft = ResultDraft {
            cv_match_rate: cv_match_rate(&output.cv_scores),
            cv_feedback: output.cv_feedback,
            project_score: project_score(&output.project_scores),
            project_feedback: output.project_feedback,
            overall_summary: output.overall_summary,
        };

        debug!(
            subsystem = "scoring",
            component = "flow",
            op = "evaluate",
            job_posting_id = %job.id,
            candidate_id = %details.candidate.id,
            cv_match_rate = draft.cv_match_rate,
            project_score = draft.project_score,
            "Evaluation complete"
        );

        Ok(draft)
    }
}
