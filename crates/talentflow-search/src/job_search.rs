//! Semantic job search over embedded posting chunks.
//!
//! A candidate's profile is decomposed into query fragments, each embedded
//! and searched independently. Fragment hits accumulate into weighted
//! per-posting scores, the relevance threshold cuts the noise, and an LLM
//! refinement pass makes the final accept/reject call per posting.

use std::sync::Arc;
use std::time::Instant;

use pgvector::Vector;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use talentflow_core::{
    CandidateDetails, ChunkRepository, EmbeddingBackend, Error, GenerationBackend, JobPosting,
    JobPostingRepository, JobScore, Result,
};

use crate::aggregator::{filter_relevant, ScoreAccumulator};

/// Chunks retrieved per query fragment.
pub const CHUNKS_PER_FRAGMENT: i64 = 5;

/// One semantic query derived from a candidate attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFragment {
    /// Section label describing what this fragment represents.
    pub section: &'static str,
    /// The free text to embed and search.
    pub text: String,
}

/// Build the query fragments for a candidate. Empty attributes are
/// skipped; ordering is fixed.
pub fn candidate_fragments(details: &CandidateDetails) -> Vec<QueryFragment> {
    let candidate = &details.candidate;
    let mut fragments = Vec::with_capacity(5);

    if !candidate.job_title.trim().is_empty() {
        fragments.push(QueryFragment {
            section: "title",
            text: candidate.job_title.clone(),
        });
    }

    if !candidate.skills.is_empty() {
        fragments.push(QueryFragment {
            section: "skills",
            text: candidate.skills.join(", "),
        });
    }

    if !candidate.soft_skills.is_empty() {
        fragments.push(QueryFragment {
            section: "skills",
            text: candidate.soft_skills.join(", "),
        });
    }

    let experience_text: Vec<String> = details
        .experiences
        .iter()
        .filter_map(|exp| {
            let position = exp.position.as_deref().unwrap_or_default();
            let description = exp.description.as_deref().unwrap_or_default();
            let combined = format!("{} {}", position, description);
            let combined = combined.trim().to_string();
            (!combined.is_empty()).then_some(combined)
        })
        .collect();
    if !experience_text.is_empty() {
        fragments.push(QueryFragment {
            section: "work",
            text: experience_text.join("\n"),
        });
    }

    let project_text: Vec<String> = details
        .projects
        .iter()
        .filter_map(|project| {
            let name = project.name.as_deref().unwrap_or_default();
            let description = project.description.as_deref().unwrap_or_default();
            let combined = format!("{} {}", name, description);
            let combined = combined.trim().to_string();
            (!combined.is_empty()).then_some(combined)
        })
        .collect();
    if !project_text.is_empty() {
        fragments.push(QueryFragment {
            section: "work",
            text: project_text.join("\n"),
        });
    }

    fragments
}

/// LLM refinement output: the subset of surviving job ids judged
/// genuinely relevant.
#[derive(Debug, Deserialize, JsonSchema)]
struct JobSelection {
    relevant_job_ids: Vec<Uuid>,
}

/// Finds job postings relevant to a candidate.
pub struct JobSearchEngine {
    chunks: Arc<dyn ChunkRepository>,
    postings: Arc<dyn JobPostingRepository>,
    embedder: Arc<dyn EmbeddingBackend>,
    generator: Arc<dyn GenerationBackend>,
}

impl JobSearchEngine {
    /// Create a new engine with its collaborators.
    pub fn new(
        chunks: Arc<dyn ChunkRepository>,
        postings: Arc<dyn JobPostingRepository>,
        embedder: Arc<dyn EmbeddingBackend>,
        generator: Arc<dyn GenerationBackend>,
    ) -> Self {
        Self {
            chunks,
            postings,
            embedder,
            generator,
        }
    }

    /// Run the full search: fragments, weighted accumulation, threshold
    /// filter, then LLM refinement. Returns job posting ids in ranked
    /// order. An empty result is a legitimate outcome, not an error.
    pub async fn find_matching_jobs(&self, details: &CandidateDetails) -> Result<Vec<Uuid>> {
        let start = Instant::now();
        let candidate_id = details.candidate.id;

        let fragments = candidate_fragments(details);
        if fragments.is_empty() {
            warn!(
                subsystem = "search",
                component = "job_search",
                candidate_id = %candidate_id,
                "Candidate has no searchable attributes"
            );
            return Ok(Vec::new());
        }

        let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
        let vectors = self.embedder.embed_texts(&texts).await?;
        if vectors.len() != fragments.len() {
            return Err(Error::Embedding(format!(
                "expected {} vectors, got {}",
                fragments.len(),
                vectors.len()
            )));
        }

        let mut accumulator = ScoreAccumulator::new();
        for (fragment, vector) in fragments.iter().zip(vectors) {
            let hits = self
                .chunks
                .search(&Vector::from(vector), CHUNKS_PER_FRAGMENT)
                .await?;
            debug!(
                subsystem = "search",
                component = "job_search",
                op = "fragment",
                section = fragment.section,
                result_count = hits.len(),
                "Fragment search complete"
            );
            accumulator.add_all(&hits);
        }

        let relevant = filter_relevant(accumulator.into_ranked());
        if relevant.is_empty() {
            info!(
                subsystem = "search",
                component = "job_search",
                candidate_id = %candidate_id,
                duration_ms = start.elapsed().as_millis() as u64,
                "No postings above relevance threshold"
            );
            return Ok(Vec::new());
        }

        let selected = self.refine(details, &relevant).await?;

        info!(
            subsystem = "search",
            component = "job_search",
            op = "find_matching_jobs",
            candidate_id = %candidate_id,
            result_count = selected.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Job search complete"
        );

        Ok(selected)
    }

    /// LLM refinement: present the surviving postings with the candidate
    /// profile; keep only the ids the model selects, preserving rank order.
    async fn refine(&self, details: &CandidateDetails, ranked: &[JobScore]) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = ranked.iter().map(|entry| entry.job_posting_id).collect();
        let postings = self.postings.get_many(&ids).await?;

        let prompt = build_refinement_prompt(details, &postings);
        let response = self
            .generator
            .generate_json_with_system(REFINEMENT_SYSTEM_PROMPT, &prompt)
            .await?;

        let selection: JobSelection = serde_json::from_value(response)
            .map_err(|e| Error::Inference(format!("malformed job selection: {}", e)))?;

        // Intersect with the ranked set; the model cannot add postings the
        // threshold already rejected.
        let selected: Vec<Uuid> = ids
            .into_iter()
            .filter(|id| selection.relevant_job_ids.contains(id))
            .collect();

        Ok(selected)
    }
}

const REFINEMENT_SYSTEM_PROMPT: &str = "You are a technical recruiter. Given a candidate profile \
     and a list of job postings, select only the postings where the candidate is a genuine fit. \
     Respond with JSON only.";

fn build_refinement_prompt(details: &CandidateDetails, postings: &[JobPosting]) -> String {
    let candidate = &details.candidate;
    let mut prompt = String::new();

    prompt.push_str("## Candidate\n");
    prompt.push_str(&format!("Job title: {}\n", candidate.job_title));
    prompt.push_str(&format!("Summary: {}\n", candidate.summary_profile));
    prompt.push_str(&format!("Skills: {}\n", candidate.skills.join(", ")));
    prompt.push_str(&format!(
        "Soft skills: {}\n",
        candidate.soft_skills.join(", ")
    ));

    prompt.push_str("\n## Job postings\n");
    for posting in postings {
        prompt.push_str(&format!("- id: {}\n  title: {}\n", posting.id, posting.title));
        if let Some(skills) = &posting.skills {
            prompt.push_str(&format!("  required skills: {}\n", skills));
        }
    }

    let schema = schemars::schema_for!(JobSelection);
    prompt.push_str(&format!(
        "\nReturn JSON matching this schema:\n{}\n",
        serde_json::to_string(&schema).unwrap_or_default()
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use talentflow_core::{Candidate, ChunkHit, CreateJobPosting, NewChunk};
    use talentflow_inference::MockInferenceBackend;

    struct FakeChunks {
        hits: Vec<ChunkHit>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ChunkRepository for FakeChunks {
        async fn store_for_posting(&self, _: Uuid, _: Vec<NewChunk>) -> Result<u64> {
            Ok(0)
        }

        async fn search(&self, _: &Vector, _: i64) -> Result<Vec<ChunkHit>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.hits.clone())
        }

        async fn count_for_posting(&self, _: Uuid) -> Result<i64> {
            Ok(self.hits.len() as i64)
        }
    }

    struct FakePostings {
        postings: HashMap<Uuid, JobPosting>,
    }

    #[async_trait]
    impl JobPostingRepository for FakePostings {
        async fn insert(&self, _: CreateJobPosting) -> Result<Uuid> {
            unimplemented!("not used in search tests")
        }

        async fn get(&self, id: Uuid) -> Result<JobPosting> {
            self.postings
                .get(&id)
                .cloned()
                .ok_or(Error::JobPostingNotFound(id))
        }

        async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<JobPosting>> {
            Ok(ids
                .iter()
                .filter_map(|id| self.postings.get(id).cloned())
                .collect())
        }

        async fn list(&self) -> Result<Vec<JobPosting>> {
            Ok(self.postings.values().cloned().collect())
        }
    }

    fn posting(id: Uuid, title: &str) -> JobPosting {
        JobPosting {
            id,
            title: title.to_string(),
            intro: None,
            work: None,
            skills: Some("Go, SQL".to_string()),
            qualification: None,
            culture: None,
            other: None,
            created_at: Utc::now(),
        }
    }

    fn details(job_title: &str, skills: Vec<&str>) -> CandidateDetails {
        CandidateDetails {
            candidate: Candidate {
                id: Uuid::new_v4(),
                name: "Test".to_string(),
                job_title: job_title.to_string(),
                summary_profile: "Backend engineer.".to_string(),
                skills: skills.into_iter().map(String::from).collect(),
                soft_skills: vec![],
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            },
            experiences: vec![],
            projects: vec![],
        }
    }

    fn engine(
        hits: Vec<ChunkHit>,
        postings: HashMap<Uuid, JobPosting>,
        response: &str,
    ) -> JobSearchEngine {
        let backend = Arc::new(
            MockInferenceBackend::new()
                .with_dimension(768)
                .with_fixed_response(response),
        );
        JobSearchEngine::new(
            Arc::new(FakeChunks {
                hits,
                calls: Mutex::new(0),
            }),
            Arc::new(FakePostings { postings }),
            backend.clone(),
            backend,
        )
    }

    #[test]
    fn test_fragments_for_full_candidate() {
        let mut d = details("Backend Engineer", vec!["Go", "SQL"]);
        d.candidate.soft_skills = vec!["communication".to_string()];
        let fragments = candidate_fragments(&d);

        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0].section, "title");
        assert_eq!(fragments[1].section, "skills");
        assert_eq!(fragments[1].text, "Go, SQL");
        assert_eq!(fragments[2].section, "skills");
    }

    #[test]
    fn test_fragments_skip_empty_attributes() {
        let d = details("", vec![]);
        assert!(candidate_fragments(&d).is_empty());
    }

    #[tokio::test]
    async fn test_search_selects_posting_above_threshold() {
        let job_a = Uuid::from_u128(1);
        let job_b = Uuid::from_u128(2);

        // A: 0.9*0.4 + 0.8*0.3 = 0.60 > 0.5; B: 0.3*0.2 = 0.06, cut.
        let hits = vec![
            ChunkHit {
                job_posting_id: job_a,
                section: "skills".to_string(),
                similarity: 0.9,
            },
            ChunkHit {
                job_posting_id: job_a,
                section: "title".to_string(),
                similarity: 0.8,
            },
            ChunkHit {
                job_posting_id: job_b,
                section: "work".to_string(),
                similarity: 0.3,
            },
        ];

        let postings = HashMap::from([
            (job_a, posting(job_a, "Backend Engineer")),
            (job_b, posting(job_b, "Designer")),
        ]);

        let response = format!("{{\"relevant_job_ids\": [\"{}\"]}}", job_a);
        let engine = engine(hits, postings, &response);

        // Single fragment (title only) keeps the accumulation to one pass
        let d = details("Backend Engineer", vec![]);
        let result = engine.find_matching_jobs(&d).await.unwrap();

        assert_eq!(result, vec![job_a]);
    }

    #[tokio::test]
    async fn test_multiple_chunks_from_one_posting_accumulate() {
        let job_a = Uuid::from_u128(1);

        // Two skills chunks: 0.9*0.4 each. Neither crosses 0.5 alone,
        // together they reach 0.72.
        let hits = vec![
            ChunkHit {
                job_posting_id: job_a,
                section: "skills".to_string(),
                similarity: 0.9,
            },
            ChunkHit {
                job_posting_id: job_a,
                section: "skills".to_string(),
                similarity: 0.9,
            },
        ];
        let postings = HashMap::from([(job_a, posting(job_a, "Backend Engineer"))]);

        let response = format!("{{\"relevant_job_ids\": [\"{}\"]}}", job_a);
        let engine = engine(hits, postings, &response);

        let d = details("Backend Engineer", vec![]);
        let result = engine.find_matching_jobs(&d).await.unwrap();
        assert_eq!(result, vec![job_a]);
    }

    #[tokio::test]
    async fn test_refinement_cannot_resurrect_cut_postings() {
        let job_a = Uuid::from_u128(1);
        let job_b = Uuid::from_u128(2);

        let hits = vec![
            ChunkHit {
                job_posting_id: job_a,
                section: "skills".to_string(),
                similarity: 0.9,
            },
            ChunkHit {
                job_posting_id: job_a,
                section: "title".to_string(),
                similarity: 0.8,
            },
        ];
        let postings = HashMap::from([(job_a, posting(job_a, "Backend Engineer"))]);

        // The model tries to select a posting the threshold rejected
        let response = format!(
            "{{\"relevant_job_ids\": [\"{}\", \"{}\"]}}",
            job_a, job_b
        );
        let engine = engine(hits, postings, &response);

        let d = details("Backend Engineer", vec![]);
        let result = engine.find_matching_jobs(&d).await.unwrap();
        assert_eq!(result, vec![job_a]);
    }

    #[tokio::test]
    async fn test_no_relevant_postings_is_empty_success() {
        let job_b = Uuid::from_u128(2);
        let hits = vec![ChunkHit {
            job_posting_id: job_b,
            section: "work".to_string(),
            similarity: 0.3,
        }];

        let engine = engine(hits, HashMap::new(), "{\"relevant_job_ids\": []}");
        let d = details("Backend Engineer", vec![]);
        let result = engine.find_matching_jobs(&d).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_candidate_without_attributes_is_empty_success() {
        let engine = engine(vec![], HashMap::new(), "{}");
        let d = details("", vec![]);
        assert!(engine.find_matching_jobs(&d).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_selection_is_error() {
        let job_a = Uuid::from_u128(1);
        let hits = vec![
            ChunkHit {
                job_posting_id: job_a,
                section: "skills".to_string(),
                similarity: 0.9,
            },
            ChunkHit {
                job_posting_id: job_a,
                section: "title".to_string(),
                similarity: 0.8,
            },
        ];
        let postings = HashMap::from([(job_a, posting(job_a, "Backend Engineer"))]);

        let engine = engine(hits, postings, "{\"unexpected\": true}");
        let d = details("Backend Engineer", vec![]);
        let err = engine.find_matching_jobs(&d).await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }
}
