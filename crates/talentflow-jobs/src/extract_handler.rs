//! Candidate extraction handler: documents in, matchings out.
//!
//! Runs the upload half of the pipeline for one candidate: read the
//! stored CV and project report, extract a structured profile, persist
//! candidate plus details in one transaction, then search for matching
//! postings and create `created` matchings for each hit. Finding zero
//! matching postings is a successful outcome.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use talentflow_core::{CandidateRepository, DocumentStore, MatchingRepository, TaskType};
use talentflow_inference::CandidateExtractor;
use talentflow_search::JobSearchEngine;

use crate::handler::{TaskContext, TaskHandler, TaskResult};

/// Payload of a candidate extraction task. The candidate id is assigned
/// at upload time so a retried delivery re-persists under the same row.
#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    candidate_id: Uuid,
    cv_path: String,
    project_report_path: String,
}

pub struct ExtractionHandler {
    candidates: Arc<dyn CandidateRepository>,
    matchings: Arc<dyn MatchingRepository>,
    documents: Arc<dyn DocumentStore>,
    extractor: CandidateExtractor,
    search: JobSearchEngine,
}

impl ExtractionHandler {
    pub fn new(
        candidates: Arc<dyn CandidateRepository>,
        matchings: Arc<dyn MatchingRepository>,
        documents: Arc<dyn DocumentStore>,
        extractor: CandidateExtractor,
        search: JobSearchEngine,
    ) -> Self {
        Self {
            candidates,
            matchings,
            documents,
            extractor,
            search,
        }
    }

    async fn read_text(&self, path: &str) -> Result<String, String> {
        let bytes = self
            .documents
            .read(path)
            .await
            .map_err(|e| format!("Failed to read document {}: {}", path, e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
impl TaskHandler for ExtractionHandler {
    fn task_type(&self) -> TaskType {
        TaskType::CandidateExtraction
    }

    async fn execute(&self, ctx: TaskContext) -> TaskResult {
        let payload: ExtractionPayload = match ctx.payload() {
            Some(p) => match serde_json::from_value(p.clone()) {
                Ok(parsed) => parsed,
                Err(e) => return TaskResult::Failed(format!("Invalid extraction payload: {}", e)),
            },
            None => return TaskResult::Failed("Missing extraction task payload".into()),
        };

        ctx.report_progress(10, Some("Reading documents"));

        let cv_text = match self.read_text(&payload.cv_path).await {
            Ok(text) => text,
            Err(e) => return TaskResult::Failed(e),
        };
        let report_text = match self.read_text(&payload.project_report_path).await {
            Ok(text) => text,
            Err(e) => return TaskResult::Failed(e),
        };

        ctx.report_progress(30, Some("Extracting candidate profile"));

        let profile = match self.extractor.extract_profile(&cv_text).await {
            Ok(profile) => profile,
            Err(e) => {
                error!(error = %e, "CV extraction failed");
                return TaskResult::Failed(format!("CV extraction failed: {}", e));
            }
        };

        ctx.report_progress(50, Some("Extracting projects"));

        let projects = match self.extractor.extract_projects(&report_text).await {
            Ok(projects) => projects,
            Err(e) => {
                error!(error = %e, "Project extraction failed");
                return TaskResult::Failed(format!("Project extraction failed: {}", e));
            }
        };

        ctx.report_progress(60, Some("Persisting candidate"));

        let candidate_id = match self
            .candidates
            .insert_with_details(payload.candidate_id, &profile, &projects)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "Failed to persist candidate");
                return TaskResult::Failed(format!("Failed to persist candidate: {}", e));
            }
        };

        let details = match self.candidates.fetch(candidate_id).await {
            Ok(details) => details,
            Err(e) => return TaskResult::Failed(format!("Failed to load candidate: {}", e)),
        };

        ctx.report_progress(80, Some("Searching matching jobs"));

        let job_ids = match self.search.find_matching_jobs(&details).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(candidate_id = %candidate_id, error = %e, "Job search failed");
                return TaskResult::Failed(format!("Job search failed: {}", e));
            }
        };

        if job_ids.is_empty() {
            warn!(
                candidate_id = %candidate_id,
                "No matching job postings found for candidate"
            );
            ctx.report_progress(100, Some("Done"));
            return TaskResult::Success(Some(json!({
                "candidate_id": candidate_id,
                "matching_ids": [],
            })));
        }

        let matching_ids = match self.matchings.insert_bulk(candidate_id, &job_ids).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(candidate_id = %candidate_id, error = %e, "Failed to create matchings");
                return TaskResult::Failed(format!("Failed to create matchings: {}", e));
            }
        };

        info!(
            candidate_id = %candidate_id,
            matching_count = matching_ids.len(),
            "Candidate extraction pipeline complete"
        );

        ctx.report_progress(100, Some("Done"));
        TaskResult::Success(Some(json!({
            "candidate_id": candidate_id,
            "matching_ids": matching_ids,
        })))
    }
}
