use chrono::{DateTime, Utc};
use ctxmem_types::{EventType, Metadata};
use serde::{Deserialize, Serialize};

/// One embedded event, as stored in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub event_id: String,
    pub session_id: String,
    pub event_type: EventType,
    pub content: String,
    pub vector: Vec<f32>,
    pub timestamp: DateTime<Utc>,
    pub metadata: Metadata,
}

/// Filters applied during a vector search, independent of the query vector.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub session_id: Option<String>,
    pub exclude_project_hash: Option<String>,
    pub event_type: Option<EventType>,
}

impl SearchFilter {
    fn matches(&self, record: &VectorRecord) -> bool {
        if let Some(session_id) = &self.session_id
            && &record.session_id != session_id
        {
            return false;
        }
        if let Some(event_type) = &self.event_type
            && &record.event_type != event_type
        {
            return false;
        }
        if let Some(project_hash) = &self.exclude_project_hash
            && record
                .metadata
                .get("project_hash")
                .and_then(|v| v.as_str())
                == Some(project_hash.as_str())
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub min_score: f32,
    pub filter: SearchFilter,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: 0.0,
            filter: SearchFilter::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub record: VectorRecord,
    pub similarity: f32,
}

pub(crate) fn passes_filter(record: &VectorRecord, filter: &SearchFilter) -> bool {
    filter.matches(record)
}
