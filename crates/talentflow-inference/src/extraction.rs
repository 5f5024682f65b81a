//! Structured extraction of candidate documents.
//!
//! CV text becomes a [`CandidateProfile`], project report text becomes a
//! list of [`ProjectDraft`]s. Both extractions render the target type's
//! JSON schema into the prompt and run the backend in JSON mode; output
//! that does not deserialize into the target type is a hard failure, no
//! partial profile is ever synthesized.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

use talentflow_core::{CandidateProfile, Error, GenerationBackend, ProjectDraft, Result};

const CV_SYSTEM_PROMPT: &str = "You are a resume parser. Extract the candidate's profile from \
     the CV text exactly as written. Do not invent facts that are not in the text. Respond with \
     JSON only.";

const PROJECT_SYSTEM_PROMPT: &str = "You are a project report parser. Extract the projects \
     described in the report exactly as written. Do not invent projects or skills that are not \
     in the text. Respond with JSON only.";

/// Wrapper so project extraction has an object at the top level.
#[derive(Debug, Deserialize, JsonSchema)]
struct ProjectExtraction {
    projects: Vec<ProjectDraft>,
}

/// Extracts structured candidate data from raw document text.
pub struct CandidateExtractor {
    generator: Arc<dyn GenerationBackend>,
}

impl CandidateExtractor {
    /// Create a new extractor over a generation backend.
    pub fn new(generator: Arc<dyn GenerationBackend>) -> Self {
        Self { generator }
    }

    /// Extract a candidate profile from CV text.
    pub async fn extract_profile(&self, cv_text: &str) -> Result<CandidateProfile> {
        let schema = schemars::schema_for!(CandidateProfile);
        let prompt = format!(
            "Extract the candidate profile from this CV. Return JSON matching this schema:\n\
             {}\n\nCV text:\n{}",
            serde_json::to_string(&schema).unwrap_or_default(),
            cv_text
        );

        let raw = self
            .generator
            .generate_json_with_system(CV_SYSTEM_PROMPT, &prompt)
            .await?;

        let profile: CandidateProfile = serde_json::from_value(raw).map_err(|e| {
            warn!(
                subsystem = "inference",
                component = "extraction",
                op = "extract_profile",
                error = %e,
                "CV extraction did not match profile schema"
            );
            Error::Inference(format!("malformed profile extraction: {e}"))
        })?;

        debug!(
            subsystem = "inference",
            component = "extraction",
            op = "extract_profile",
            skill_count = profile.skills.len(),
            experience_count = profile.experiences.len(),
            "CV extraction complete"
        );
        Ok(profile)
    }

    /// Extract project entries from project report text.
    pub async fn extract_projects(&self, report_text: &str) -> Result<Vec<ProjectDraft>> {
        let schema = schemars::schema_for!(ProjectExtraction);
        let prompt = format!(
            "Extract the projects from this report. Return JSON matching this schema:\n\
             {}\n\nReport text:\n{}",
            serde_json::to_string(&schema).unwrap_or_default(),
            report_text
        );

        let raw = self
            .generator
            .generate_json_with_system(PROJECT_SYSTEM_PROMPT, &prompt)
            .await?;

        let extraction: ProjectExtraction = serde_json::from_value(raw).map_err(|e| {
            warn!(
                subsystem = "inference",
                component = "extraction",
                op = "extract_projects",
                error = %e,
                "Project extraction did not match schema"
            );
            Error::Inference(format!("malformed project extraction: {e}"))
        })?;

        debug!(
            subsystem = "inference",
            component = "extraction",
            op = "extract_projects",
            project_count = extraction.projects.len(),
            "Project extraction complete"
        );
        Ok(extraction.projects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockInferenceBackend;

    #[tokio::test]
    async fn test_extract_profile() {
        let backend = MockInferenceBackend::new().with_fixed_response(
            r#"{
                "name": "Ada Lovelace",
                "job_title": "Software Engineer",
                "summary_profile": "Engineer with analytical background.",
                "skills": ["Rust", "SQL"],
                "soft_skills": ["communication"],
                "experiences": [
                    {
                        "date_start": "2020-01",
                        "date_end": "2023-06",
                        "company": "Analytical Engines Ltd",
                        "position": "Engineer",
                        "description": "Built computation pipelines."
                    }
                ]
            }"#,
        );
        let extractor = CandidateExtractor::new(Arc::new(backend));

        let profile = extractor.extract_profile("cv text").await.unwrap();
        assert_eq!(profile.name, "Ada Lovelace");
        assert_eq!(profile.skills, vec!["Rust", "SQL"]);
        assert_eq!(profile.experiences.len(), 1);
        assert_eq!(
            profile.experiences[0].company.as_deref(),
            Some("Analytical Engines Ltd")
        );
    }

    #[tokio::test]
    async fn test_extract_profile_schema_violation_fails() {
        let backend =
            MockInferenceBackend::new().with_fixed_response(r#"{"name": "only a name"}"#);
        let extractor = CandidateExtractor::new(Arc::new(backend));

        let err = extractor.extract_profile("cv text").await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[tokio::test]
    async fn test_extract_projects() {
        let backend = MockInferenceBackend::new().with_fixed_response(
            r#"{
                "projects": [
                    {
                        "name": "Ledger",
                        "company": null,
                        "date_start": "2022",
                        "date_end": "2023",
                        "position": "Lead",
                        "description": "Double-entry accounting service.",
                        "skills": ["Rust", "Postgres"]
                    },
                    {
                        "name": "Importer",
                        "company": null,
                        "date_start": null,
                        "date_end": null,
                        "position": null,
                        "description": null
                    }
                ]
            }"#,
        );
        let extractor = CandidateExtractor::new(Arc::new(backend));

        let projects = extractor.extract_projects("report text").await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].skills, vec!["Rust", "Postgres"]);
        assert!(projects[1].skills.is_empty(), "missing skills defaults to empty");
    }

    #[tokio::test]
    async fn test_extract_projects_malformed_fails() {
        let backend = MockInferenceBackend::new().with_fixed_response(r#"["not", "wrapped"]"#);
        let extractor = CandidateExtractor::new(Arc::new(backend));

        let err = extractor.extract_projects("report text").await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[tokio::test]
    async fn test_prompt_carries_schema_and_text() {
        let backend = MockInferenceBackend::new().with_fixed_response(
            r#"{"name": "x", "job_title": "y", "summary_profile": "z",
                "skills": [], "soft_skills": [], "experiences": []}"#,
        );
        let extractor = CandidateExtractor::new(Arc::new(backend.clone()));

        extractor.extract_profile("THE CV BODY").await.unwrap();

        let calls = backend.get_calls();
        let prompt = &calls
            .iter()
            .find(|c| c.operation == "generate")
            .unwrap()
            .input;
        assert!(prompt.contains("summary_profile"));
        assert!(prompt.contains("THE CV BODY"));
    }
}
