//! Scoring prompt construction.
//!
//! One structured prompt carries the job sections, the candidate profile,
//! and both retrieved rubric sets. The JSON schema of the expected
//! response is rendered into the prompt; the backend's JSON mode makes
//! the output parseable.

use talentflow_core::{CandidateDetails, JobPosting, RubricMatch};

use crate::flow::ScoringOutput;

/// System prompt for the evaluation call.
pub const SCORING_SYSTEM_PROMPT: &str = "You are an experienced technical hiring evaluator. \
     Score the candidate against each rubric on an integer scale of 1 to 5, where 1 is a poor \
     fit and 5 is an excellent fit. Provide honest, specific feedback. Respond with JSON only.";

/// Build the evaluation prompt for one candidate×job pairing.
///
/// Rubrics must be passed in retrieval order; the scorer maps positions
/// to fixed weights.
pub fn build_scoring_prompt(
    job: &JobPosting,
    details: &CandidateDetails,
    cv_rubrics: &[RubricMatch],
    project_rubrics: &[RubricMatch],
) -> String {
    let candidate = &details.candidate;
    let mut prompt = String::new();

    prompt.push_str("## Job posting\n");
    prompt.push_str(&format!("Title: {}\n", job.title));
    for (tag, text) in job.sections() {
        prompt.push_str(&format!("{}: {}\n", tag, text));
    }

    prompt.push_str("\n## Candidate\n");
    prompt.push_str(&format!("Name: {}\n", candidate.name));
    prompt.push_str(&format!("Job title: {}\n", candidate.job_title));
    prompt.push_str(&format!("Summary: {}\n", candidate.summary_profile));
    prompt.push_str(&format!("Skills: {}\n", candidate.skills.join(", ")));
    prompt.push_str(&format!(
        "Soft skills: {}\n",
        candidate.soft_skills.join(", ")
    ));

    if !details.experiences.is_empty() {
        prompt.push_str("\n### Work experience\n");
        for exp in &details.experiences {
            prompt.push_str(&format!(
                "- {} at {} ({} to {}): {}\n",
                exp.position.as_deref().unwrap_or("unknown role"),
                exp.company.as_deref().unwrap_or("unknown company"),
                exp.date_start.as_deref().unwrap_or("?"),
                exp.date_end.as_deref().unwrap_or("?"),
                exp.description.as_deref().unwrap_or(""),
            ));
        }
    }

    if !details.projects.is_empty() {
        prompt.push_str("\n### Projects\n");
        for project in &details.projects {
            prompt.push_str(&format!(
                "- {}: {} (skills: {})\n",
                project.name.as_deref().unwrap_or("untitled"),
                project.description.as_deref().unwrap_or(""),
                project.skills.join(", "),
            ));
        }
    }

    prompt.push_str("\n## CV rubrics (score each, in order)\n");
    for (i, rubric) in cv_rubrics.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {}: {}\n",
            i + 1,
            rubric.parameter,
            rubric.description
        ));
    }

    prompt.push_str("\n## Project rubrics (score each, in order)\n");
    for (i, rubric) in project_rubrics.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {}: {}\n",
            i + 1,
            rubric.parameter,
            rubric.description
        ));
    }

    let schema = schemars::schema_for!(ScoringOutput);
    prompt.push_str(&format!(
        "\nReturn JSON matching this schema. cv_scores must have one entry per CV rubric and \
         project_scores one entry per project rubric, in the listed order:\n{}\n",
        serde_json::to_string(&schema).unwrap_or_default()
    ));

    prompt
}
