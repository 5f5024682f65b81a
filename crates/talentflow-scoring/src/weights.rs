//! Fixed positional weight tables for rubric score aggregation.
//!
//! Weights are keyed by rubric *position*, not rubric identity, so the
//! rubric order handed to the prompt must be the stable retrieval order.
//! Missing trailing scores contribute 0 and weights are never
//! renormalized: an incomplete evaluation scores down, never up.

/// Percent weights for the first four CV rubric scores, in order.
pub const CV_WEIGHTS: [f64; 4] = [40.0, 25.0, 20.0, 15.0];

/// Percent weights for the first five project rubric scores, in order.
pub const PROJECT_WEIGHTS: [f64; 5] = [30.0, 25.0, 20.0, 15.0, 10.0];

/// Weighted average on the raw 1..=5 scale. Scores beyond the weight
/// table are ignored; missing slots contribute 0.
fn weighted_raw(scores: &[i64], weights: &[f64]) -> f64 {
    weights
        .iter()
        .zip(scores)
        .map(|(weight, &score)| score as f64 * weight / 100.0)
        .sum()
}

/// CV match rate in [0, 100]: weighted 5-point average scaled by 20.
pub fn cv_match_rate(scores: &[i64]) -> f64 {
    weighted_raw(scores, &CV_WEIGHTS) * 20.0
}

/// Project score in [0, 10]: weighted 5-point average scaled by 2.
pub fn project_score(scores: &[i64]) -> f64 {
    weighted_raw(scores, &PROJECT_WEIGHTS) * 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cv_perfect_scores() {
        assert_eq!(cv_match_rate(&[5, 5, 5, 5]), 100.0);
    }

    #[test]
    fn test_cv_minimum_scores() {
        assert_eq!(cv_match_rate(&[1, 1, 1, 1]), 20.0);
    }

    #[test]
    fn test_cv_no_scores() {
        assert_eq!(cv_match_rate(&[]), 0.0);
    }

    #[test]
    fn test_cv_missing_slots_are_not_renormalized() {
        // Only the first weight applies; the rest contribute 0
        assert_eq!(cv_match_rate(&[5]), 5.0 * 0.40 * 20.0);
    }

    #[test]
    fn test_cv_extra_scores_ignored() {
        assert_eq!(cv_match_rate(&[5, 5, 5, 5, 5, 5]), 100.0);
    }

    #[test]
    fn test_project_perfect_scores() {
        assert_eq!(project_score(&[5, 5, 5, 5, 5]), 10.0);
    }

    #[test]
    fn test_project_no_scores() {
        assert_eq!(project_score(&[]), 0.0);
    }

    #[test]
    fn test_project_mixed_scores() {
        // 3*0.30 + 4*0.25 + 2*0.20 + 5*0.15 + 1*0.10 = 3.15 → 6.3
        let score = project_score(&[3, 4, 2, 5, 1]);
        assert!((score - 6.3).abs() < 1e-9);
    }

    #[test]
    fn test_weight_tables_sum_to_100() {
        assert_eq!(CV_WEIGHTS.iter().sum::<f64>(), 100.0);
        assert_eq!(PROJECT_WEIGHTS.iter().sum::<f64>(), 100.0);
    }
}
