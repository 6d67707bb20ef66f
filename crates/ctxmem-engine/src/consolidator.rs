use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use ctxmem_index::EventLog;
use ctxmem_types::{ConsolidatedMemory, ConsolidatedRule, Event, WorkingSetItem};
use std::collections::{HashMap, HashSet};

/// Interval/count/idle triggers the scheduler (`ctxmem-runtime`) checks
/// between consolidation runs.
#[derive(Debug, Clone, Copy)]
pub struct ConsolidationTriggers {
    pub interval: Duration,
    pub event_count: usize,
    pub idle: Duration,
}

impl Default for ConsolidationTriggers {
    fn default() -> Self {
        Self {
            interval: Duration::minutes(15),
            event_count: 20,
            idle: Duration::minutes(5),
        }
    }
}

/// Pure decision of whether a consolidation pass should run right now,
/// given the last run time, current working-set size, and how long the
/// working set has been untouched.
pub fn should_trigger(
    now: DateTime<Utc>,
    last_run: DateTime<Utc>,
    working_set_count: usize,
    idle_since: DateTime<Utc>,
    triggers: ConsolidationTriggers,
) -> bool {
    now - last_run >= triggers.interval
        || working_set_count >= triggers.event_count
        || now - idle_since >= triggers.idle
}

#[derive(Debug, Clone, Default)]
pub struct ConsolidationReport {
    pub groups_considered: usize,
    pub memories_created: Vec<String>,
    pub rules_promoted: Vec<String>,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub reduction_ratio: f64,
    pub quality_guard_passed: bool,
}

const PROXIMITY_WINDOW_MINUTES: f64 = 60.0;
const PROMOTION_MIN_CONFIDENCE: f64 = 0.55;
const PROMOTION_MIN_SOURCES: usize = 4;

/// One pass over the working set: group by shared topic, merge
/// heavily-overlapping groups, and turn every group of at least 3 events
/// into a `ConsolidatedMemory`, promoting the ones that clear the quality
/// bar to stable `ConsolidatedRule`s.
pub fn run_consolidation(log: &EventLog) -> Result<ConsolidationReport> {
    let working_set = log.list_working_set()?;
    let mut items: Vec<(WorkingSetItem, Event)> = Vec::new();
    for item in working_set {
        if let Some(event) = log.get_by_id(&item.event_id)? {
            items.push((item, event));
        }
    }

    let already_consolidated: HashSet<String> = log
        .list_consolidated_memories()?
        .into_iter()
        .flat_map(|m| m.source_events)
        .collect();

    let mut topic_groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, (item, _)) in items.iter().enumerate() {
        if already_consolidated.contains(&item.event_id) {
            continue;
        }
        for topic in &item.topics {
            topic_groups.entry(topic.clone()).or_default().push(i);
        }
    }
    let groups = merge_overlapping_groups(topic_groups.into_values().collect());

    let tokens_before: usize = items.iter().map(|(_, event)| event.content.len() / 4).sum();
    let mut tokens_after = 0usize;
    let mut report = ConsolidationReport {
        quality_guard_passed: true,
        ..Default::default()
    };
    let mut prune_ids: Vec<i64> = Vec::new();
    let mut groups_considered = 0usize;

    for indices in &groups {
        if indices.len() < 3 {
            continue;
        }
        groups_considered += 1;

        let group: Vec<&(WorkingSetItem, Event)> = indices.iter().map(|&i| &items[i]).collect();
        let topics = dominant_topics(&group);
        let confidence = compute_confidence(&group);
        let source_events: Vec<String> = group.iter().map(|(item, _)| item.event_id.clone()).collect();
        let summary = build_summary(&topics, &group);

        let memory = ConsolidatedMemory {
            memory_id: uuid::Uuid::new_v4().to_string(),
            summary,
            topics,
            source_events,
            confidence,
            created_at: Utc::now(),
            accessed_at: None,
            access_count: 0,
        };

        log.insert_consolidated_memory(&memory)?;
        tokens_after += memory.summary.len() / 4;
        report.memories_created.push(memory.memory_id.clone());
        if confidence < PROMOTION_MIN_CONFIDENCE {
            report.quality_guard_passed = false;
        }
        if memory.source_events.len() >= PROMOTION_MIN_SOURCES && confidence >= PROMOTION_MIN_CONFIDENCE {
            let rule: ConsolidatedRule = memory.clone().into();
            log.promote_consolidated_rule(&rule)?;
            report.rules_promoted.push(memory.memory_id.clone());
        }

        let mut by_age: Vec<&(WorkingSetItem, Event)> = group.clone();
        by_age.sort_by_key(|(item, _)| item.added_at);
        let prune_count = by_age.len() / 2;
        prune_ids.extend(by_age.into_iter().take(prune_count).map(|(item, _)| item.id));
    }

    if !prune_ids.is_empty() {
        log.delete_working_set_items(&prune_ids)?;
    }

    report.groups_considered = groups_considered;
    report.tokens_before = tokens_before;
    report.tokens_after = tokens_after;
    report.reduction_ratio = if tokens_before > 0 {
        1.0 - (tokens_after as f64 / tokens_before as f64)
    } else {
        0.0
    };

    Ok(report)
}

/// Groups overlap when more than half of the smaller group's events also
/// appear in the larger one; merging repeats until no pair overlaps.
fn merge_overlapping_groups(mut groups: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    loop {
        let mut merged = false;
        'search: for i in 0..groups.len() {
            for j in (i + 1)..groups.len() {
                if overlap_fraction(&groups[i], &groups[j]) > 0.5 {
                    let mut union: Vec<usize> = groups[i].iter().chain(groups[j].iter()).copied().collect();
                    union.sort_unstable();
                    union.dedup();
                    groups[i] = union;
                    groups.remove(j);
                    merged = true;
                    break 'search;
                }
            }
        }
        if !merged {
            return groups;
        }
    }
}

fn overlap_fraction(a: &[usize], b: &[usize]) -> f64 {
    let set_a: HashSet<usize> = a.iter().copied().collect();
    let set_b: HashSet<usize> = b.iter().copied().collect();
    let smaller = set_a.len().min(set_b.len());
    if smaller == 0 {
        return 0.0;
    }
    set_a.intersection(&set_b).count() as f64 / smaller as f64
}

/// Up to 5 topics, most frequent first, ties broken alphabetically.
fn dominant_topics(group: &[&(WorkingSetItem, Event)]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for (item, _) in group {
        for topic in &item.topics {
            *counts.entry(topic.clone()).or_default() += 1;
        }
    }
    let mut topics: Vec<(String, usize)> = counts.into_iter().collect();
    topics.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    topics.into_iter().take(5).map(|(topic, _)| topic).collect()
}

fn compute_confidence(group: &[&(WorkingSetItem, Event)]) -> f64 {
    let event_score = group.iter().map(|(item, _)| item.relevance).sum::<f64>() / group.len() as f64;

    let timestamps: Vec<DateTime<Utc>> = group.iter().map(|(_, event)| event.timestamp).collect();
    let min_t = *timestamps.iter().min().expect("non-empty group");
    let max_t = *timestamps.iter().max().expect("non-empty group");
    let span_minutes = (max_t - min_t).num_seconds() as f64 / 60.0;
    let time_proximity = (1.0 - span_minutes / PROXIMITY_WINDOW_MINUTES).clamp(0.0, 1.0);

    let dominant = dominant_topics(group);
    let topic_consistency = match dominant.first() {
        Some(top_topic) => {
            let sharing = group
                .iter()
                .filter(|(item, _)| item.topics.iter().any(|t| t == top_topic))
                .count();
            sharing as f64 / group.len() as f64
        }
        None => 0.0,
    };

    (0.4 * event_score + 0.4 * time_proximity + 0.2 * topic_consistency).clamp(0.0, 1.0)
}

fn build_summary(topics: &[String], group: &[&(WorkingSetItem, Event)]) -> String {
    let sentences: Vec<String> = group
        .iter()
        .take(10)
        .filter_map(|(_, event)| first_sentence(&event.content))
        .collect();

    format!("Topics: {}. {}", topics.join(", "), sentences.join(" ")).trim().to_string()
}

fn first_sentence(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    let end = trimmed.find(['.', '!', '?']).map(|i| i + 1).unwrap_or(trimmed.len());
    let sentence = trimmed[..end].trim();
    (!sentence.is_empty()).then(|| sentence.to_string())
}
