//! Fixed section weights and the relevance threshold.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Minimum aggregate score a job must exceed (strictly) to survive
/// retrieval. Precision-over-recall cut: borderline jobs are dropped
/// rather than flooding the LLM refinement step with noise.
pub const RELEVANCE_THRESHOLD: f32 = 0.5;

/// Weight applied to chunk sections not present in the weight table.
pub const FALLBACK_SECTION_WEIGHT: f32 = 0.1;

/// Fixed per-section multipliers. Tunable constants, not derived values.
static SECTION_WEIGHTS: Lazy<HashMap<&'static str, f32>> = Lazy::new(|| {
    HashMap::from([
        ("title", 0.3),
        ("skills", 0.4),
        ("work", 0.2),
        ("project", 0.1),
    ])
});

/// Look up the weight for a chunk section tag.
pub fn section_weight(section: &str) -> f32 {
    SECTION_WEIGHTS
        .get(section)
        .copied()
        .unwrap_or(FALLBACK_SECTION_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_section_weights() {
        assert_eq!(section_weight("title"), 0.3);
        assert_eq!(section_weight("skills"), 0.4);
        assert_eq!(section_weight("work"), 0.2);
        assert_eq!(section_weight("project"), 0.1);
    }

    #[test]
    fn test_unknown_sections_use_fallback() {
        assert_eq!(section_weight("intro"), FALLBACK_SECTION_WEIGHT);
        assert_eq!(section_weight("culture"), FALLBACK_SECTION_WEIGHT);
        assert_eq!(section_weight(""), FALLBACK_SECTION_WEIGHT);
    }

    #[test]
    fn test_threshold_value() {
        assert_eq!(RELEVANCE_THRESHOLD, 0.5);
    }
}
