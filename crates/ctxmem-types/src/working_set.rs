use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single entry in the bounded, short-lived "what's relevant right now"
/// set maintained by the consolidator (C8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingSetItem {
    pub id: i64,
    pub event_id: String,
    pub added_at: DateTime<Utc>,
    pub relevance: f64,
    pub topics: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl WorkingSetItem {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A rule-based summary produced by consolidating a cluster of working-set
/// events that share a topic and a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedMemory {
    pub memory_id: String,
    pub summary: String,
    pub topics: Vec<String>,
    pub source_events: Vec<String>,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub accessed_at: Option<DateTime<Utc>>,
    pub access_count: i64,
}

impl ConsolidatedMemory {
    /// Stable promotion threshold: confidence ≥ 0.55 and at least 4
    /// contributing source events.
    pub fn is_promotable(&self) -> bool {
        self.confidence >= 0.55 && self.source_events.len() >= 4
    }
}

/// A `ConsolidatedMemory` that has crossed the promotion threshold and is
/// treated as a stable rule rather than a provisional summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedRule {
    pub memory_id: String,
    pub summary: String,
    pub topics: Vec<String>,
    pub source_events: Vec<String>,
    pub confidence: f64,
    pub promoted_at: DateTime<Utc>,
}

impl From<ConsolidatedMemory> for ConsolidatedRule {
    fn from(memory: ConsolidatedMemory) -> Self {
        Self {
            memory_id: memory.memory_id,
            summary: memory.summary,
            topics: memory.topics,
            source_events: memory.source_events,
            confidence: memory.confidence,
            promoted_at: Utc::now(),
        }
    }
}
