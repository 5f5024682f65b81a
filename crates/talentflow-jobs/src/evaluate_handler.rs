//! Matching evaluation handler.
//!
//! Executes the scoring half of the pipeline for one matching. Delivery
//! is at-least-once: the handler first tries the guarded
//! queued-to-processing transition and treats a lost race as an already
//! handled task, not a failure. On any downstream error the matching is
//! moved to `error` so it never sticks in `processing`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use talentflow_core::{
    CandidateRepository, JobPostingRepository, MatchingRepository, RubricKind, TaskType,
};
use talentflow_scoring::ScoringFlow;
use talentflow_search::RubricRetriever;

use crate::handler::{TaskContext, TaskHandler, TaskResult};

pub struct EvaluationHandler {
    matchings: Arc<dyn MatchingRepository>,
    candidates: Arc<dyn CandidateRepository>,
    postings: Arc<dyn JobPostingRepository>,
    rubrics: RubricRetriever,
    scoring: ScoringFlow,
}

impl EvaluationHandler {
    pub fn new(
        matchings: Arc<dyn MatchingRepository>,
        candidates: Arc<dyn CandidateRepository>,
        postings: Arc<dyn JobPostingRepository>,
        rubrics: RubricRetriever,
        scoring: ScoringFlow,
    ) -> Self {
        Self {
            matchings,
            candidates,
            postings,
            rubrics,
            scoring,
        }
    }

    /// Run the evaluation after the processing claim succeeded. Any error
    /// from here on moves the matching to `error`.
    async fn evaluate(&self, ctx: &TaskContext, matching_id: Uuid) -> TaskResult {
        let matching = match self.matchings.get(matching_id).await {
            Ok(m) => m,
            Err(e) => return self.fail(matching_id, format!("Failed to load matching: {}", e)).await,
        };

        ctx.report_progress(20, Some("Loading job and candidate"));

        let job = match self.postings.get(matching.job_posting_id).await {
            Ok(job) => job,
            Err(e) => return self.fail(matching_id, format!("Failed to load posting: {}", e)).await,
        };
        let details = match self.candidates.fetch(matching.candidate_id).await {
            Ok(details) => details,
            Err(e) => {
                return self
                    .fail(matching_id, format!("Failed to load candidate: {}", e))
                    .await
            }
        };

        ctx.report_progress(40, Some("Retrieving rubrics"));

        let cv_rubrics = match self.rubrics.retrieve(job.id, RubricKind::Cv).await {
            Ok(rubrics) => rubrics,
            Err(e) => {
                return self
                    .fail(matching_id, format!("CV rubric retrieval failed: {}", e))
                    .await
            }
        };
        let project_rubrics = match self.rubrics.retrieve(job.id, RubricKind::Project).await {
            Ok(rubrics) => rubrics,
            Err(e) => {
                return self
                    .fail(matching_id, format!("Project rubric retrieval failed: {}", e))
                    .await
            }
        };

        ctx.report_progress(60, Some("Scoring candidate"));

        let draft = match self
            .scoring
            .evaluate(&job, &details, &cv_rubrics, &project_rubrics)
            .await
        {
            Ok(draft) => draft,
            Err(e) => {
                return self
                    .fail(matching_id, format!("Scoring failed: {}", e))
                    .await
            }
        };

        ctx.report_progress(90, Some("Storing result"));

        if let Err(e) = self.matchings.complete(matching_id, &draft).await {
            return self
                .fail(matching_id, format!("Failed to store result: {}", e))
                .await;
        }

        info!(
            matching_id = %matching_id,
            cv_match_rate = draft.cv_match_rate,
            project_score = draft.project_score,
            "Matching evaluation complete"
        );

        ctx.report_progress(100, Some("Done"));
        TaskResult::Success(Some(json!({
            "matching_id": matching_id,
            "cv_match_rate": draft.cv_match_rate,
            "project_score": draft.project_score,
        })))
    }

    /// Move the matching to `error` and fail the task.
    async fn fail(&self, matching_id: Uuid, message: String) -> TaskResult {
        error!(matching_id = %matching_id, error = %message, "Matching evaluation failed");
        if let Err(e) = self.matchings.mark_error(matching_id).await {
            error!(
                matching_id = %matching_id,
                error = %e,
                "Failed to move matching to error state"
            );
        }
        TaskResult::Failed(message)
    }
}

#[async_trait]
impl TaskHandler for EvaluationHandler {
    fn task_type(&self) -> TaskType {
        TaskType::MatchingEvaluation
    }

    async fn execute(&self, ctx: TaskContext) -> TaskResult {
        let matching_id = match ctx.matching_id() {
            Some(id) => id,
            None => return TaskResult::Failed("Evaluation task carries no matching".into()),
        };

        ctx.report_progress(10, Some("Claiming matching"));

        // Guarded queued -> processing transition. A false return means
        // another delivery already claimed this matching or it is terminal.
        match self.matchings.begin_processing(matching_id).await {
            Ok(true) => {}
            Ok(false) => {
                info!(
                    matching_id = %matching_id,
                    "Matching already claimed or terminal, skipping"
                );
                return TaskResult::Success(Some(json!({
                    "matching_id": matching_id,
                    "skipped": true,
                })));
            }
            Err(e) => {
                return TaskResult::Failed(format!("Failed to claim matching: {}", e));
            }
        }

        self.evaluate(&ctx, matching_id).await
    }
}
