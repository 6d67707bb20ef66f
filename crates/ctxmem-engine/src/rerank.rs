use std::collections::HashSet;

/// Blend weights for combining a semantic (vector) score, a lexical
/// (keyword-overlap) score, and a recency score into one ranking value.
/// Normalized so the blend is independent of their absolute scale.
#[derive(Debug, Clone, Copy)]
pub struct RerankWeights {
    pub semantic: f64,
    pub lexical: f64,
    pub recency: f64,
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            semantic: 0.7,
            lexical: 0.2,
            recency: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecayPolicy {
    pub enabled: bool,
    pub window_days: f64,
    pub max_penalty: f64,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            window_days: 30.0,
            max_penalty: 0.15,
        }
    }
}

/// One candidate's raw component scores, all already normalized to `[0,1]`.
#[derive(Debug, Clone, Copy)]
pub struct CandidateScores {
    pub semantic: f64,
    pub lexical: f64,
    pub age_days: f64,
}

/// `blended = (w_s·semantic + w_l·lexical + w_r·recency) / (w_s+w_l+w_r)`,
/// with `recency = max(0, 1 - age_days/window_days)`, then an optional age
/// penalty when the candidate is stale and has little lexical overlap.
pub fn blended_score(scores: CandidateScores, weights: RerankWeights, decay: DecayPolicy) -> f64 {
    let recency = (1.0 - scores.age_days / decay.window_days).max(0.0);
    let total_weight = weights.semantic + weights.lexical + weights.recency;
    let blended = if total_weight > 0.0 {
        (weights.semantic * scores.semantic + weights.lexical * scores.lexical + weights.recency * recency)
            / total_weight
    } else {
        0.0
    };

    if decay.enabled && scores.age_days > decay.window_days && scores.lexical < 0.5 {
        let overrun = (scores.age_days - decay.window_days) / decay.window_days;
        let penalty = decay.max_penalty * overrun.min(1.0);
        (blended - penalty).max(0.0)
    } else {
        blended
    }
}

pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Fraction of query tokens that also appear in the event's tokens.
pub fn lexical_overlap(query: &str, event_content: &str) -> f64 {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return 0.0;
    }
    let event_tokens = tokenize(event_content);
    let matched = query_tokens.iter().filter(|t| event_tokens.contains(*t)).count();
    matched as f64 / query_tokens.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_scores_blend_to_the_weighted_average() {
        let scores = CandidateScores {
            semantic: 0.9,
            lexical: 0.9,
            age_days: 0.0,
        };
        let score = blended_score(scores, RerankWeights::default(), DecayPolicy::default());
        assert!((score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn stale_low_overlap_candidate_loses_to_fresh_one_with_equal_semantic_score() {
        let weights = RerankWeights::default();
        let decay = DecayPolicy::default();

        let fresh = blended_score(
            CandidateScores {
                semantic: 0.9,
                lexical: 0.1,
                age_days: 0.0,
            },
            weights,
            decay,
        );
        let stale = blended_score(
            CandidateScores {
                semantic: 0.9,
                lexical: 0.1,
                age_days: 120.0,
            },
            weights,
            decay,
        );
        assert!(fresh > stale);
    }

    #[test]
    fn high_lexical_overlap_candidate_is_exempt_from_the_age_penalty() {
        let weights = RerankWeights::default();
        let decay = DecayPolicy::default();

        let no_penalty_applies = blended_score(
            CandidateScores {
                semantic: 0.9,
                lexical: 0.9,
                age_days: 120.0,
            },
            weights,
            decay,
        );
        let recency_only = (1.0 - 120.0 / decay.window_days).max(0.0);
        let expected = weights.semantic * 0.9 + weights.lexical * 0.9 + weights.recency * recency_only;
        assert!((no_penalty_applies - expected).abs() < 1e-9);
    }

    #[test]
    fn lexical_overlap_counts_matched_query_tokens() {
        assert!((lexical_overlap("morning briefing", "the morning briefing preference") - 1.0).abs() < 1e-9);
        assert!((lexical_overlap("morning briefing", "skip after-lunch summaries") - 0.0).abs() < 1e-9);
    }
}
