//! Core data models for talentflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Re-export the pgvector vector type used for all embeddings.
pub use pgvector::Vector;

// =============================================================================
// CANDIDATE
// =============================================================================

/// A candidate extracted from an uploaded CV / project report pair.
///
/// Immutable once created by the extraction pipeline; removal uses a
/// soft-delete marker so historical matchings stay resolvable.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub job_title: String,
    pub summary_profile: String,
    pub skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// One work experience entry owned by a candidate.
///
/// Date fields are free text as extracted ("Jan 2021", "present"); the
/// pipeline never computes with them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub description: Option<String>,
}

/// One project entry owned by a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub name: Option<String>,
    pub company: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub position: Option<String>,
    pub description: Option<String>,
    pub skills: Vec<String>,
}

/// Structured candidate profile as produced by CV extraction.
///
/// This is the single typed value passed between extraction, persistence,
/// and job search. The JSON schema derived from it is rendered into the
/// extraction prompt, so field names here are part of the LLM contract.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CandidateProfile {
    pub name: String,
    pub job_title: String,
    pub summary_profile: String,
    pub skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub experiences: Vec<ExperienceDraft>,
}

/// Work experience entry inside an extracted [`CandidateProfile`].
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExperienceDraft {
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub description: Option<String>,
}

/// Project entry as produced by project-report extraction.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProjectDraft {
    pub name: Option<String>,
    pub company: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub position: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// A candidate together with its owned experiences and projects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDetails {
    pub candidate: Candidate,
    pub experiences: Vec<Experience>,
    pub projects: Vec<Project>,
}

// =============================================================================
// JOB POSTING
// =============================================================================

/// Static list of job posting section names, in declaration order.
///
/// Chunking and embedding iterate this list uniformly; adding a section
/// means adding it here and to [`JobPosting::sections`].
pub const JOB_SECTIONS: [&str; 6] = [
    "intro",
    "work",
    "skills",
    "qualification",
    "culture",
    "other",
];

/// A job posting: a title plus named free-text sections.
///
/// Long-lived, created by seeding/administration; the matching pipeline
/// only reads these rows.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub intro: Option<String>,
    pub work: Option<String>,
    pub skills: Option<String>,
    pub qualification: Option<String>,
    pub culture: Option<String>,
    pub other: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl JobPosting {
    /// Iterate the non-empty sections as `(section tag, text)` pairs,
    /// in declaration order.
    pub fn sections(&self) -> Vec<(&'static str, &str)> {
        let fields: [(&'static str, Option<&String>); 6] = [
            ("intro", self.intro.as_ref()),
            ("work", self.work.as_ref()),
            ("skills", self.skills.as_ref()),
            ("qualification", self.qualification.as_ref()),
            ("culture", self.culture.as_ref()),
            ("other", self.other.as_ref()),
        ];
        fields
            .into_iter()
            .filter_map(|(tag, text)| match text {
                Some(t) if !t.trim().is_empty() => Some((tag, t.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// An embedded chunk of one job posting section.
///
/// `chunk_index` is the monotonic ordinal within the section; chunking may
/// split long text but never reorders it.
#[derive(Debug, Clone)]
pub struct JobChunk {
    pub id: Uuid,
    pub job_posting_id: Uuid,
    pub section: String,
    pub chunk_index: i32,
    pub content: String,
    pub embedding: Vector,
}

/// One nearest-neighbor hit from the chunk index.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHit {
    pub job_posting_id: Uuid,
    pub section: String,
    pub similarity: f32,
}

/// Aggregate relevance score for one job posting after weighted accumulation.
#[derive(Debug, Clone, PartialEq)]
pub struct JobScore {
    pub job_posting_id: Uuid,
    pub score: f32,
}

// =============================================================================
// RUBRIC
// =============================================================================

/// Rubric category: scored against the CV or against the project report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RubricKind {
    Cv,
    Project,
}

impl RubricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RubricKind::Cv => "cv",
            RubricKind::Project => "project",
        }
    }
}

impl std::str::FromStr for RubricKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cv" => Ok(RubricKind::Cv),
            "project" => Ok(RubricKind::Project),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown rubric kind: {}",
                other
            ))),
        }
    }
}

/// A scoring dimension with its own description embedding.
///
/// The rubric set is fixed per deployment and seeded ahead of time.
#[derive(Debug, Clone)]
pub struct Rubric {
    pub id: Uuid,
    pub kind: RubricKind,
    pub parameter: String,
    pub description: String,
    pub embedding: Vector,
}

/// A rubric surfaced by retrieval, carrying its best chunk similarity.
///
/// Used both for raw per-chunk pairs and for the grouped max-per-rubric
/// output; the similarity semantics depend on which stage produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RubricMatch {
    pub rubric_id: Uuid,
    pub parameter: String,
    pub description: String,
    pub similarity: f32,
}

// =============================================================================
// MATCHING STATE MACHINE
// =============================================================================

/// Lifecycle states of a candidate×job matching.
///
/// `created → queued → processing → completed | error`; the last two are
/// terminal. Transitions are driven exclusively by the evaluation sweep and
/// the evaluation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatchingStatus {
    Created,
    Queued,
    Processing,
    Completed,
    Error,
}

impl MatchingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchingStatus::Created => "created",
            MatchingStatus::Queued => "queued",
            MatchingStatus::Processing => "processing",
            MatchingStatus::Completed => "completed",
            MatchingStatus::Error => "error",
        }
    }

    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchingStatus::Completed | MatchingStatus::Error)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition(&self, next: MatchingStatus) -> bool {
        use MatchingStatus::*;
        matches!(
            (self, next),
            (Created, Queued)
                | (Queued, Processing)
                | (Processing, Completed)
                | (Processing, Error)
        )
    }
}

impl std::str::FromStr for MatchingStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(MatchingStatus::Created),
            "queued" => Ok(MatchingStatus::Queued),
            "processing" => Ok(MatchingStatus::Processing),
            "completed" => Ok(MatchingStatus::Completed),
            "error" => Ok(MatchingStatus::Error),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown matching status: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for MatchingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate×job pairing tracked through the scoring state machine.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Matching {
    pub id: Uuid,
    pub job_posting_id: Uuid,
    pub candidate_id: Uuid,
    pub status: MatchingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// The persisted outcome of a completed matching.
///
/// Exists iff the matching reached `completed`; at most one per matching.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MatchingResult {
    pub id: Uuid,
    pub matching_id: Uuid,
    /// CV match rate in [0, 100].
    pub cv_match_rate: f64,
    pub cv_feedback: String,
    /// Project score in [0, 10].
    pub project_score: f64,
    pub project_feedback: String,
    pub overall_summary: String,
    pub created_at: DateTime<Utc>,
}

/// An unpersisted scoring outcome, produced by the scoring aggregator and
/// written atomically with the `completed` transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDraft {
    pub cv_match_rate: f64,
    pub cv_feedback: String,
    pub project_score: f64,
    pub project_feedback: String,
    pub overall_summary: String,
}

/// Current status of a matching plus its result when completed.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EvaluationView {
    pub id: Uuid,
    pub status: MatchingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchingResult>,
}

/// One promoted row in an evaluation sweep response.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MatchingQueued {
    pub id: Uuid,
    pub status: MatchingStatus,
}

// =============================================================================
// TASK QUEUE
// =============================================================================

/// Status of a background task in the durable queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// The two background task types driving the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Extract a candidate from uploaded documents, then run job search.
    CandidateExtraction,
    /// Score one queued matching against the rubrics.
    MatchingEvaluation,
}

impl TaskType {
    /// Default queue priority. Extraction outranks evaluation so a fresh
    /// upload surfaces its matchings before backlogged scoring work.
    pub fn default_priority(&self) -> i32 {
        match self {
            TaskType::CandidateExtraction => 7,
            TaskType::MatchingEvaluation => 5,
        }
    }
}

/// A durable queue task row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    /// The matching this task targets, when it targets one
    /// (evaluation tasks); extraction tasks carry no matching.
    pub matching_id: Option<Uuid>,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub priority: i32,
    pub payload: Option<JsonValue>,
    pub result: Option<JsonValue>,
    pub error_message: Option<String>,
    pub progress_percent: i32,
    pub progress_message: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Aggregate queue statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: i64,
    pub processing: i64,
    pub completed_last_hour: i64,
    pub failed_last_hour: i64,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(skills: Option<&str>) -> JobPosting {
        JobPosting {
            id: Uuid::new_v4(),
            title: "Backend Engineer".to_string(),
            intro: Some("We build things.".to_string()),
            work: None,
            skills: skills.map(String::from),
            qualification: Some("   ".to_string()),
            culture: None,
            other: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sections_skips_empty_and_whitespace() {
        let p = posting(Some("Go, SQL"));
        let sections = p.sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].0, "intro");
        assert_eq!(sections[1], ("skills", "Go, SQL"));
    }

    #[test]
    fn test_sections_preserve_declaration_order() {
        let p = JobPosting {
            id: Uuid::new_v4(),
            title: "t".to_string(),
            intro: Some("a".to_string()),
            work: Some("b".to_string()),
            skills: Some("c".to_string()),
            qualification: Some("d".to_string()),
            culture: Some("e".to_string()),
            other: Some("f".to_string()),
            created_at: Utc::now(),
        };
        let tags: Vec<&str> = p.sections().into_iter().map(|(t, _)| t).collect();
        assert_eq!(tags, JOB_SECTIONS.to_vec());
    }

    #[test]
    fn test_matching_status_as_str() {
        assert_eq!(MatchingStatus::Created.as_str(), "created");
        assert_eq!(MatchingStatus::Queued.as_str(), "queued");
        assert_eq!(MatchingStatus::Processing.as_str(), "processing");
        assert_eq!(MatchingStatus::Completed.as_str(), "completed");
        assert_eq!(MatchingStatus::Error.as_str(), "error");
    }

    #[test]
    fn test_matching_status_round_trip() {
        for status in [
            MatchingStatus::Created,
            MatchingStatus::Queued,
            MatchingStatus::Processing,
            MatchingStatus::Completed,
            MatchingStatus::Error,
        ] {
            let parsed: MatchingStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_matching_status_parse_unknown() {
        assert!("done".parse::<MatchingStatus>().is_err());
        assert!("".parse::<MatchingStatus>().is_err());
        assert!("CREATED".parse::<MatchingStatus>().is_err());
    }

    #[test]
    fn test_state_machine_valid_transitions() {
        use MatchingStatus::*;
        assert!(Created.can_transition(Queued));
        assert!(Queued.can_transition(Processing));
        assert!(Processing.can_transition(Completed));
        assert!(Processing.can_transition(Error));
    }

    #[test]
    fn test_state_machine_invalid_transitions() {
        use MatchingStatus::*;
        assert!(!Created.can_transition(Processing));
        assert!(!Created.can_transition(Completed));
        assert!(!Queued.can_transition(Completed));
        assert!(!Queued.can_transition(Created));
        assert!(!Processing.can_transition(Queued));
        // Terminal states admit nothing
        for next in [Created, Queued, Processing, Completed, Error] {
            assert!(!Completed.can_transition(next));
            assert!(!Error.can_transition(next));
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(MatchingStatus::Completed.is_terminal());
        assert!(MatchingStatus::Error.is_terminal());
        assert!(!MatchingStatus::Created.is_terminal());
        assert!(!MatchingStatus::Queued.is_terminal());
        assert!(!MatchingStatus::Processing.is_terminal());
    }

    #[test]
    fn test_matching_status_serde_lowercase() {
        let json = serde_json::to_string(&MatchingStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let back: MatchingStatus = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(back, MatchingStatus::Error);
    }

    #[test]
    fn test_rubric_kind_round_trip() {
        assert_eq!("cv".parse::<RubricKind>().unwrap(), RubricKind::Cv);
        assert_eq!(
            "project".parse::<RubricKind>().unwrap(),
            RubricKind::Project
        );
        assert!("resume".parse::<RubricKind>().is_err());
    }

    #[test]
    fn test_task_type_priorities() {
        assert!(
            TaskType::CandidateExtraction.default_priority()
                > TaskType::MatchingEvaluation.default_priority()
        );
    }

    #[test]
    fn test_evaluation_view_omits_absent_result() {
        let view = EvaluationView {
            id: Uuid::new_v4(),
            status: MatchingStatus::Processing,
            result: None,
        };
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("result"));
    }

    #[test]
    fn test_candidate_profile_schema_mentions_fields() {
        let schema = schemars::schema_for!(CandidateProfile);
        let text = serde_json::to_string(&schema).unwrap();
        assert!(text.contains("job_title"));
        assert!(text.contains("soft_skills"));
        assert!(text.contains("experiences"));
    }

    #[test]
    fn test_project_draft_skills_default() {
        let draft: ProjectDraft = serde_json::from_str(
            r#"{"name":"Chat app","company":null,"date_start":null,"date_end":null,"position":null,"description":null}"#,
        )
        .unwrap();
        assert!(draft.skills.is_empty());
    }
}
