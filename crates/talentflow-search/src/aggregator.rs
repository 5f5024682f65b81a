//! Weighted score accumulation across query fragments.
//!
//! Each chunk hit contributes `similarity × weight[section]` to its owning
//! job posting. A posting hit by several fragments accumulates into a
//! single entry. Ranking is score descending with first-seen order as the
//! tie-break (stable sort over insertion order).

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use talentflow_core::{ChunkHit, JobScore};

use crate::weights::{section_weight, RELEVANCE_THRESHOLD};

/// Accumulates weighted similarity contributions keyed by job posting.
#[derive(Debug, Default)]
pub struct ScoreAccumulator {
    order: Vec<Uuid>,
    scores: HashMap<Uuid, f32>,
}

impl ScoreAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one chunk hit's contribution.
    pub fn add(&mut self, hit: &ChunkHit) {
        let weight = section_weight(&hit.section);
        match self.scores.entry(hit.job_posting_id) {
            std::collections::hash_map::Entry::Occupied(mut e) => {
                *e.get_mut() += hit.similarity * weight;
            }
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(hit.similarity * weight);
                self.order.push(hit.job_posting_id);
            }
        }
    }

    /// Add all hits from one fragment's search.
    pub fn add_all(&mut self, hits: &[ChunkHit]) {
        for hit in hits {
            self.add(hit);
        }
    }

    /// Number of distinct postings accumulated so far.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no hits have been accumulated.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Finish accumulation: postings ranked by score descending, ties
    /// broken by first-seen order.
    pub fn into_ranked(self) -> Vec<JobScore> {
        let mut ranked: Vec<JobScore> = self
            .order
            .into_iter()
            .map(|id| JobScore {
                job_posting_id: id,
                score: self.scores[&id],
            })
            .collect();

        // Stable sort preserves first-seen order among equal scores.
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            subsystem = "search",
            component = "aggregator",
            result_count = ranked.len(),
            "Score accumulation complete"
        );

        ranked
    }
}

/// Keep only postings whose aggregate score strictly exceeds the
/// relevance threshold.
pub fn filter_relevant(ranked: Vec<JobScore>) -> Vec<JobScore> {
    ranked
        .into_iter()
        .filter(|entry| entry.score > RELEVANCE_THRESHOLD)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: Uuid, section: &str, similarity: f32) -> ChunkHit {
        ChunkHit {
            job_posting_id: id,
            section: section.to_string(),
            similarity,
        }
    }

    #[test]
    fn test_single_hit_weighted() {
        let id = Uuid::new_v4();
        let mut acc = ScoreAccumulator::new();
        acc.add(&hit(id, "skills", 0.9));

        let ranked = acc.into_ranked();
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].score - 0.36).abs() < 1e-6);
    }

    #[test]
    fn test_same_posting_accumulates_once() {
        let id = Uuid::new_v4();
        let mut acc = ScoreAccumulator::new();
        acc.add(&hit(id, "skills", 0.9));
        acc.add(&hit(id, "title", 0.8));

        let ranked = acc.into_ranked();
        assert_eq!(ranked.len(), 1, "two hits for one posting must merge");
        // 0.9*0.4 + 0.8*0.3 = 0.60
        assert!((ranked[0].score - 0.60).abs() < 1e-6);
    }

    #[test]
    fn test_skills_and_title_scenario_passes_threshold() {
        let id = Uuid::new_v4();
        let mut acc = ScoreAccumulator::new();
        acc.add(&hit(id, "skills", 0.9));
        acc.add(&hit(id, "title", 0.8));

        let relevant = filter_relevant(acc.into_ranked());
        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].job_posting_id, id);
    }

    #[test]
    fn test_threshold_is_strict() {
        let at = Uuid::new_v4();
        let above = Uuid::new_v4();

        let ranked = vec![
            JobScore {
                job_posting_id: above,
                score: 0.51,
            },
            JobScore {
                job_posting_id: at,
                score: 0.5,
            },
        ];

        let relevant = filter_relevant(ranked);
        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].job_posting_id, above);
    }

    #[test]
    fn test_ranking_is_descending() {
        let low = Uuid::new_v4();
        let high = Uuid::new_v4();

        let mut acc = ScoreAccumulator::new();
        acc.add(&hit(low, "work", 0.5));
        acc.add(&hit(high, "skills", 0.9));

        let ranked = acc.into_ranked();
        assert_eq!(ranked[0].job_posting_id, high);
        assert_eq!(ranked[1].job_posting_id, low);
    }

    #[test]
    fn test_equal_scores_keep_first_seen_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let mut acc = ScoreAccumulator::new();
        acc.add(&hit(first, "skills", 0.5));
        acc.add(&hit(second, "skills", 0.5));

        let ranked = acc.into_ranked();
        assert_eq!(ranked[0].job_posting_id, first);
        assert_eq!(ranked[1].job_posting_id, second);
    }

    #[test]
    fn test_unknown_section_uses_fallback_weight() {
        let id = Uuid::new_v4();
        let mut acc = ScoreAccumulator::new();
        acc.add(&hit(id, "culture", 1.0));

        let ranked = acc.into_ranked();
        assert!((ranked[0].score - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_empty_accumulator() {
        let acc = ScoreAccumulator::new();
        assert!(acc.is_empty());
        assert!(acc.into_ranked().is_empty());
    }
}
