//! Rubric retrieval: best chunk per rubric, no weighted sum.
//!
//! Rubrics have no sections, so this mode groups (rubric, chunk)
//! similarity pairs by rubric, keeps the highest-similarity chunk per
//! rubric, sorts descending, and truncates to the requested count.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use talentflow_core::{Result, RubricKind, RubricMatch, RubricRepository};

/// CV rubrics retrieved per evaluation. Matches the CV weight table length.
pub const CV_RUBRIC_COUNT: usize = 4;

/// Project rubrics retrieved per evaluation. Matches the project weight
/// table length.
pub const PROJECT_RUBRIC_COUNT: usize = 5;

/// Reduce raw (rubric, chunk) pairs to the top `k` rubrics by best chunk
/// similarity. Ties keep first-seen order (stable sort).
pub fn top_rubrics(pairs: Vec<RubricMatch>, k: usize) -> Vec<RubricMatch> {
    let mut best: HashMap<Uuid, usize> = HashMap::new();
    let mut grouped: Vec<RubricMatch> = Vec::new();

    for pair in pairs {
        match best.get(&pair.rubric_id) {
            Some(&idx) => {
                if pair.similarity > grouped[idx].similarity {
                    grouped[idx] = pair;
                }
            }
            None => {
                best.insert(pair.rubric_id, grouped.len());
                grouped.push(pair);
            }
        }
    }

    grouped.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    grouped.truncate(k);
    grouped
}

/// Retrieves the rubric sets used by an evaluation.
pub struct RubricRetriever {
    rubrics: Arc<dyn RubricRepository>,
}

impl RubricRetriever {
    /// Create a new retriever.
    pub fn new(rubrics: Arc<dyn RubricRepository>) -> Self {
        Self { rubrics }
    }

    /// Retrieve the top rubrics of one kind for a posting. The count is
    /// fixed per kind to match the positional scoring weight tables.
    pub async fn retrieve(
        &self,
        job_posting_id: Uuid,
        kind: RubricKind,
    ) -> Result<Vec<RubricMatch>> {
        let k = match kind {
            RubricKind::Cv => CV_RUBRIC_COUNT,
            RubricKind::Project => PROJECT_RUBRIC_COUNT,
        };

        let pairs = self
            .rubrics
            .similarities_for_posting(job_posting_id, kind)
            .await?;
        let top = top_rubrics(pairs, k);

        debug!(
            subsystem = "search",
            component = "rubric_search",
            op = "retrieve",
            job_posting_id = %job_posting_id,
            kind = kind.as_str(),
            result_count = top.len(),
            "Rubric retrieval complete"
        );

        Ok(top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(rubric_id: Uuid, similarity: f32) -> RubricMatch {
        RubricMatch {
            rubric_id,
            parameter: "technical_skills".to_string(),
            description: "Depth of technical skills.".to_string(),
            similarity,
        }
    }

    #[test]
    fn test_best_chunk_per_rubric_wins() {
        let rubric = Uuid::new_v4();
        let top = top_rubrics(vec![pair(rubric, 0.4), pair(rubric, 0.9), pair(rubric, 0.7)], 4);

        assert_eq!(top.len(), 1);
        assert_eq!(top[0].similarity, 0.9);
    }

    #[test]
    fn test_sorted_descending_and_truncated() {
        let pairs: Vec<RubricMatch> = (1..=6)
            .map(|i| pair(Uuid::from_u128(i), i as f32 / 10.0))
            .collect();

        let top = top_rubrics(pairs, 4);
        assert_eq!(top.len(), 4);
        assert_eq!(top[0].similarity, 0.6);
        assert_eq!(top[3].similarity, 0.3);
    }

    #[test]
    fn test_fewer_rubrics_than_requested() {
        let top = top_rubrics(vec![pair(Uuid::new_v4(), 0.5)], 5);
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(top_rubrics(vec![], 4).is_empty());
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let first = Uuid::from_u128(10);
        let second = Uuid::from_u128(20);
        let top = top_rubrics(vec![pair(first, 0.5), pair(second, 0.5)], 4);
        assert_eq!(top[0].rubric_id, first);
        assert_eq!(top[1].rubric_id, second);
    }

    #[test]
    fn test_counts_match_weight_tables() {
        assert_eq!(CV_RUBRIC_COUNT, 4);
        assert_eq!(PROJECT_RUBRIC_COUNT, 5);
    }
}
