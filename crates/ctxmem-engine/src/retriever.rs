use crate::confidence::{classify, combined_score, ConfidenceThresholds, ConfidenceWeights, MatchConfidence};
use crate::context::{assemble_context, AssembledContext, RetrievedMemory};
use crate::error::{Error, Result};
use crate::rerank::{blended_score, lexical_overlap, CandidateScores, DecayPolicy, RerankWeights};
use crate::scope::Scope;
use chrono::Utc;
use ctxmem_index::EventLog;
use ctxmem_types::Event;
use ctxmem_vector::{SearchFilter, SearchOptions, VectorIndex};

/// Which result source to consult. `Auto` is the only strategy that walks
/// the fallback chain; `Fast`/`Deep` commit to a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Auto,
    Fast,
    Deep,
}

#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    pub strategy: Strategy,
    pub top_k: usize,
    pub min_score: f64,
    pub max_tokens: usize,
    pub scope: Scope,
    pub rerank_with_keyword: bool,
    pub rerank_weights: RerankWeights,
    pub decay_policy: DecayPolicy,
    pub include_session_context: bool,
    /// Embedding of `query`, required for any stage that searches the
    /// vector index (`Deep`, and `Auto`'s fallback chain past Primary).
    /// Computing this is `ctxmem-embed`'s job; the retriever only consumes
    /// the result, so it stays free of an embedder dependency.
    pub query_vector: Option<Vec<f32>>,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Auto,
            top_k: 10,
            min_score: 0.65,
            max_tokens: 2000,
            scope: Scope::default(),
            rerank_with_keyword: true,
            rerank_weights: RerankWeights::default(),
            decay_policy: DecayPolicy::default(),
            include_session_context: true,
            query_vector: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrieveResult {
    pub memories: Vec<RetrievedMemory>,
    pub confidence: MatchConfidence,
    pub context: AssembledContext,
    pub fallback_trace: Vec<String>,
}

/// A candidate before reranking: the full event plus whatever raw score
/// its source stage produced (a cosine similarity for vector hits, `0.0`
/// for pure keyword hits — lexical overlap is recomputed uniformly from
/// `content` during reranking instead of trusting the FTS rank).
struct Candidate {
    event: Event,
    semantic: f64,
}

pub fn retrieve(
    log: &EventLog,
    vector_index: &VectorIndex,
    query: &str,
    opts: &RetrieveOptions,
) -> Result<RetrieveResult> {
    let mut trace: Vec<String> = Vec::new();

    let primary_candidates = match opts.strategy {
        Strategy::Fast => keyword_candidates(log, query, opts.top_k * 4)?,
        Strategy::Deep => vector_candidates(vector_index, log, query_vector(opts)?, &opts.scope, opts.min_score, opts.top_k * 4)?,
        Strategy::Auto => keyword_candidates(log, query, opts.top_k * 4)?,
    };
    let (mut memories, mut confidence) = process_stage(&primary_candidates, query, &opts.scope, opts, false);

    if opts.strategy == Strategy::Auto && needs_fallback(&memories, confidence) {
        trace.push("fallback:deep".to_string());
        let candidates = vector_candidates(vector_index, log, query_vector(opts)?, &opts.scope, opts.min_score, opts.top_k * 4)?;
        let (m, c) = process_stage(&candidates, query, &opts.scope, opts, false);
        memories = m;
        confidence = c;

        if needs_fallback(&memories, confidence) {
            trace.push("fallback:scope-expanded".to_string());
            let expanded_scope = Scope::default();
            let expanded_min_score = (opts.min_score - 0.15).max(0.5);
            let candidates = vector_candidates(vector_index, log, query_vector(opts)?, &expanded_scope, expanded_min_score, opts.top_k * 4)?;
            let (m, c) = process_stage(&candidates, query, &expanded_scope, opts, false);
            memories = m;
            confidence = c;

            if needs_fallback(&memories, confidence) {
                trace.push("fallback:summary".to_string());
                let candidates = summary_candidates(log, query, opts.top_k)?;
                let (m, c) = process_stage(&candidates, query, &Scope::default(), opts, true);
                memories = m;
                confidence = c;
            }
        }
    }

    let memories = if opts.include_session_context {
        attach_neighbors(log, memories)?
    } else {
        memories
    };

    let context = assemble_context(&memories, opts.max_tokens);

    Ok(RetrieveResult {
        memories,
        confidence,
        context,
        fallback_trace: trace,
    })
}

fn needs_fallback(memories: &[RetrievedMemory], confidence: MatchConfidence) -> bool {
    memories.is_empty() || confidence == MatchConfidence::None
}

fn query_vector(opts: &RetrieveOptions) -> Result<&[f32]> {
    opts.query_vector
        .as_deref()
        .ok_or_else(|| Error::InputInvalid("retrieve requires a query_vector for a deep-searching stage".to_string()))
}

fn keyword_candidates(log: &EventLog, query: &str, limit: usize) -> Result<Vec<Candidate>> {
    let hits = log.keyword_search(query, limit)?;
    Ok(hits
        .into_iter()
        .map(|hit| Candidate { event: hit.event, semantic: 0.0 })
        .collect())
}

fn vector_candidates(
    vector_index: &VectorIndex,
    log: &EventLog,
    query_vector: &[f32],
    scope: &Scope,
    min_score: f64,
    limit: usize,
) -> Result<Vec<Candidate>> {
    let search_opts = SearchOptions {
        limit,
        min_score: min_score as f32,
        filter: SearchFilter {
            session_id: scope.session_id.clone(),
            exclude_project_hash: None,
            event_type: scope.event_types.first().copied(),
        },
    };
    let hits = vector_index.search(query_vector, &search_opts)?;

    let mut candidates = Vec::with_capacity(hits.len());
    for hit in hits {
        if let Some(event) = log.get_by_id(&hit.record.event_id)? {
            candidates.push(Candidate {
                event,
                semantic: hit.similarity as f64,
            });
        }
    }
    Ok(candidates)
}

/// Scan recent events and score them by plain token overlap with the
/// query, mapping the overlap fraction into the synthetic range
/// `[0.25, 0.6)` reserved for this last-resort stage.
fn summary_candidates(log: &EventLog, query: &str, top_k: usize) -> Result<Vec<Candidate>> {
    let scan_limit = (top_k * 6).max(20);
    let mut scored: Vec<(Event, f64)> = log
        .recent_events(scan_limit)?
        .into_iter()
        .map(|event| {
            let overlap = lexical_overlap(query, &event.content);
            (event, overlap)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);

    Ok(scored
        .into_iter()
        .map(|(event, overlap)| Candidate {
            event,
            semantic: 0.25 + overlap.clamp(0.0, 1.0) * (0.6 - 0.25),
        })
        .collect())
}

/// Rerank, scope-filter, and truncate one stage's candidates, then
/// classify the result set's confidence.
///
/// `skip_rerank` is set for the summary fallback: its synthetic scores
/// are already the final ranking signal, not raw components to blend.
fn process_stage(
    candidates: &[Candidate],
    query: &str,
    scope: &Scope,
    opts: &RetrieveOptions,
    skip_rerank: bool,
) -> (Vec<RetrievedMemory>, MatchConfidence) {
    let now = Utc::now();

    let mut scored: Vec<(Event, f64, f64)> = candidates
        .iter()
        .map(|c| {
            let lexical = if opts.rerank_with_keyword { lexical_overlap(query, &c.event.content) } else { 0.0 };
            let age_days = (now - c.event.timestamp).num_seconds() as f64 / 86_400.0;
            let blended = if skip_rerank {
                c.semantic
            } else {
                blended_score(
                    CandidateScores { semantic: c.semantic, lexical, age_days },
                    opts.rerank_weights,
                    opts.decay_policy,
                )
            };
            (c.event.clone(), blended, lexical)
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.retain(|(event, _, _)| scope.matches(event));
    scored.truncate(opts.top_k);

    let combined: Vec<f64> = scored
        .iter()
        .map(|(event, blended, lexical)| {
            let age_days = (now - event.timestamp).num_seconds() as f64 / 86_400.0;
            let recency_bonus = (1.0 - age_days / opts.decay_policy.window_days).max(0.0);
            combined_score(*blended, *lexical, recency_bonus, 1.0, ConfidenceWeights::default())
        })
        .collect();
    let confidence = classify(&combined, ConfidenceThresholds::default());

    let memories = scored
        .into_iter()
        .map(|(event, score, _)| RetrievedMemory {
            event,
            score,
            neighbor_before: None,
            neighbor_after: None,
        })
        .collect();

    (memories, confidence)
}

/// Fill in `neighbor_before`/`neighbor_after` from the same session's
/// rowid-ordered event list.
fn attach_neighbors(log: &EventLog, memories: Vec<RetrievedMemory>) -> Result<Vec<RetrievedMemory>> {
    let mut out = Vec::with_capacity(memories.len());
    for mut memory in memories {
        let session_events = log.get_session_events(&memory.event.session_id)?;
        if let Some(pos) = session_events.iter().position(|e| e.id == memory.event.id) {
            memory.neighbor_before = pos.checked_sub(1).and_then(|i| session_events.get(i)).cloned();
            memory.neighbor_after = session_events.get(pos + 1).cloned();
        }
        out.push(memory);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxmem_types::{EventInput, EventType};
    use ctxmem_vector::VectorRecord;
    use tempfile::TempDir;

    fn vector_event(log: &mut EventLog, session_id: &str, content: &str) -> Event {
        log.append(EventInput::new(EventType::UserPrompt, session_id, content), &[1]).unwrap();
        log.get_session_events(session_id).unwrap().pop().unwrap()
    }

    fn embed(n: f32) -> Vec<f32> {
        vec![n, 1.0 - n]
    }

    #[test]
    fn auto_strategy_falls_back_to_deep_when_keyword_finds_nothing() {
        let mut log = EventLog::open_in_memory().unwrap();
        let dir = TempDir::new().unwrap();
        let mut index = VectorIndex::open(dir.path().join("v.json"), 2).unwrap();

        let e1 = vector_event(&mut log, "s1", "morning briefing preference");
        let e2 = vector_event(&mut log, "s1", "skip after-lunch summaries");
        index
            .upsert(VectorRecord {
                id: "v1".into(),
                event_id: e1.id.clone(),
                session_id: "s1".into(),
                event_type: EventType::UserPrompt,
                content: e1.content.clone(),
                vector: embed(0.9),
                timestamp: e1.timestamp,
                metadata: Default::default(),
            })
            .unwrap();
        index
            .upsert(VectorRecord {
                id: "v2".into(),
                event_id: e2.id.clone(),
                session_id: "s1".into(),
                event_type: EventType::UserPrompt,
                content: e2.content.clone(),
                vector: embed(0.1),
                timestamp: e2.timestamp,
                metadata: Default::default(),
            })
            .unwrap();

        let mut opts = RetrieveOptions {
            top_k: 3,
            min_score: 0.5,
            query_vector: Some(embed(0.9)),
            ..Default::default()
        };
        opts.scope.session_id = Some("s1".to_string());

        let result = retrieve(&log, &index, "briefing", &opts).unwrap();
        assert!(result.fallback_trace.contains(&"fallback:deep".to_string()));
        assert_eq!(result.memories[0].event.id, e1.id);
    }

    #[test]
    fn scope_filter_narrows_to_a_single_matching_event() {
        let mut log = EventLog::open_in_memory().unwrap();
        let dir = TempDir::new().unwrap();
        let mut index = VectorIndex::open(dir.path().join("v.json"), 2).unwrap();

        let mut e1 = EventInput::new(EventType::UserPrompt, "s1", "morning briefing preference");
        e1.canonical_key = Some("pref/briefing/morning".to_string());
        log.append(e1, &[1]).unwrap();
        let e1 = log.get_session_events("s1").unwrap().remove(0);

        let e2 = vector_event(&mut log, "s1", "skip after-lunch summaries");

        for (id, event, vec) in [("v1", &e1, embed(0.9)), ("v2", &e2, embed(0.1))] {
            index
                .upsert(VectorRecord {
                    id: id.into(),
                    event_id: event.id.clone(),
                    session_id: "s1".into(),
                    event_type: EventType::UserPrompt,
                    content: event.content.clone(),
                    vector: vec,
                    timestamp: event.timestamp,
                    metadata: Default::default(),
                })
                .unwrap();
        }

        let mut opts = RetrieveOptions {
            top_k: 3,
            min_score: 0.5,
            query_vector: Some(embed(0.9)),
            ..Default::default()
        };
        opts.scope.session_id = Some("s1".to_string());
        opts.scope.canonical_key_prefix = Some("pref/briefing/morning".to_string());
        opts.scope.content_includes = vec!["morning".to_string()];

        let result = retrieve(&log, &index, "briefing", &opts).unwrap();
        assert_eq!(result.memories.len(), 1);
        assert_eq!(result.memories[0].event.id, e1.id);
    }

    #[test]
    fn deep_result_with_confidence_skips_the_summary_fallback() {
        let mut log = EventLog::open_in_memory().unwrap();
        let dir = TempDir::new().unwrap();
        let mut index = VectorIndex::open(dir.path().join("v.json"), 2).unwrap();

        let e1 = vector_event(&mut log, "s1", "retry backoff policy for the embedding worker");
        index
            .upsert(VectorRecord {
                id: "v1".into(),
                event_id: e1.id.clone(),
                session_id: "s1".into(),
                event_type: EventType::UserPrompt,
                content: e1.content.clone(),
                vector: embed(0.99),
                timestamp: e1.timestamp,
                metadata: Default::default(),
            })
            .unwrap();

        let opts = RetrieveOptions {
            strategy: Strategy::Deep,
            top_k: 3,
            min_score: 0.5,
            query_vector: Some(embed(0.99)),
            ..Default::default()
        };

        let result = retrieve(&log, &index, "retry backoff policy", &opts).unwrap();
        assert!(result.fallback_trace.is_empty());
        assert!(!result.memories.is_empty());
    }
}
