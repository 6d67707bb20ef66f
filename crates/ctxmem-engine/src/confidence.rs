/// Overall match quality bucket reported alongside a retrieval result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchConfidence {
    High,
    Suggested,
    None,
}

impl MatchConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchConfidence::High => "high",
            MatchConfidence::Suggested => "suggested",
            MatchConfidence::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceWeights {
    pub semantic: f64,
    pub fts: f64,
    pub recency: f64,
    pub status: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            semantic: 0.4,
            fts: 0.25,
            recency: 0.2,
            status: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceThresholds {
    pub high_min: f64,
    pub high_gap: f64,
    pub suggested_min: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high_min: 0.92,
            high_gap: 0.03,
            suggested_min: 0.75,
        }
    }
}

/// `0.4·semantic + 0.25·fts_score + 0.2·recency_bonus + 0.15·status_weight`,
/// capped at `1.0`.
pub fn combined_score(
    semantic: f64,
    fts_score: f64,
    recency_bonus: f64,
    status_weight: f64,
    weights: ConfidenceWeights,
) -> f64 {
    let score = weights.semantic * semantic
        + weights.fts * fts_score
        + weights.recency * recency_bonus
        + weights.status * status_weight;
    score.min(1.0)
}

/// Classifies a ranked list of combined scores (descending) into a single
/// confidence bucket for the whole result set, driven by the top score and
/// its gap to the runner-up.
pub fn classify(scores: &[f64], thresholds: ConfidenceThresholds) -> MatchConfidence {
    let Some(&top) = scores.first() else {
        return MatchConfidence::None;
    };
    let gap = scores.get(1).map(|second| top - second).unwrap_or(f64::INFINITY);

    if top >= thresholds.high_min && gap >= thresholds.high_gap {
        MatchConfidence::High
    } else if top >= thresholds.suggested_min {
        MatchConfidence::Suggested
    } else {
        MatchConfidence::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scores_are_no_match() {
        assert_eq!(classify(&[], ConfidenceThresholds::default()), MatchConfidence::None);
    }

    #[test]
    fn high_confidence_requires_both_top_score_and_gap() {
        assert_eq!(
            classify(&[0.95, 0.80], ConfidenceThresholds::default()),
            MatchConfidence::High
        );
        // Top score alone, with a tight runner-up, only reaches "suggested".
        assert_eq!(
            classify(&[0.95, 0.94], ConfidenceThresholds::default()),
            MatchConfidence::Suggested
        );
    }

    #[test]
    fn suggested_threshold_applies_without_a_runner_up() {
        assert_eq!(classify(&[0.80], ConfidenceThresholds::default()), MatchConfidence::Suggested);
        assert_eq!(classify(&[0.5], ConfidenceThresholds::default()), MatchConfidence::None);
    }

    #[test]
    fn combined_score_is_capped_at_one() {
        let weights = ConfidenceWeights::default();
        assert_eq!(combined_score(1.0, 1.0, 1.0, 1.0, weights), 1.0);
    }
}
