use crate::error::Result;
use ctxmem_index::EventLog;
use ctxmem_types::{Event, EventInput, EventType, Metadata};
use ctxmem_vector::{SearchFilter, SearchHit, SearchOptions, VectorIndex, VectorRecord};

const SHARED_SESSION_ID: &str = "shared";
const EMBEDDING_VERSION: i64 = 1;

/// Writes a promoted cross-project entry into the shared store's event
/// log (and its vector index, if the caller already has an embedding for
/// it). `source_project_hash` is stamped onto the entry's metadata so a
/// later `vector_search_shared` can exclude a project's own contributions
/// from its own results.
pub fn promote_entry(
    log: &mut EventLog,
    vector_index: Option<(&mut VectorIndex, Vec<f32>)>,
    content: &str,
    source_project_hash: &str,
    topics: &[String],
) -> Result<Event> {
    let mut metadata = Metadata::new();
    metadata.insert("project_hash", source_project_hash);
    metadata.insert("topics", serde_json::json!(topics));

    let input = EventInput::new(EventType::SessionSummary, SHARED_SESSION_ID, content).with_metadata(metadata);
    let outcome = log.append(input, &[EMBEDDING_VERSION])?;
    let event = log
        .get_by_id(&outcome.id)?
        .ok_or_else(|| crate::error::Error::NotFound(format!("shared entry {} missing after insert", outcome.id)))?;

    if let Some((vector_index, vector)) = vector_index {
        vector_index.upsert(VectorRecord {
            id: event.id.clone(),
            event_id: event.id.clone(),
            session_id: event.session_id.clone(),
            event_type: event.event_type,
            content: event.content.clone(),
            vector,
            timestamp: event.timestamp,
            metadata: event.metadata.clone(),
        })?;
    }

    Ok(event)
}

/// Text search over the shared store. Every hit's access count is bumped
/// — the usage counters the store tracks per read.
pub fn search_shared(log: &EventLog, query: &str, limit: usize) -> Result<Vec<Event>> {
    let hits = log.keyword_search(query, limit)?;
    let ids: Vec<String> = hits.iter().map(|h| h.event.id.clone()).collect();
    if !ids.is_empty() {
        log.increment_access_count(&ids)?;
    }
    Ok(hits.into_iter().map(|h| h.event).collect())
}

/// Vector search over the shared store, excluding entries promoted by
/// `exclude_project_hash` so a project never sees its own contributions
/// reflected back as "shared" wisdom.
pub fn vector_search_shared(
    log: &EventLog,
    vector_index: &VectorIndex,
    query_vector: &[f32],
    exclude_project_hash: &str,
    limit: usize,
) -> Result<Vec<SearchHit>> {
    let opts = SearchOptions {
        limit,
        min_score: 0.0,
        filter: SearchFilter {
            exclude_project_hash: Some(exclude_project_hash.to_string()),
            ..Default::default()
        },
    };
    let hits = vector_index.search(query_vector, &opts)?;
    let ids: Vec<String> = hits.iter().map(|h| h.record.event_id.clone()).collect();
    if !ids.is_empty() {
        log.increment_access_count(&ids)?;
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promoted_entry_is_found_by_keyword_search() {
        let mut log = EventLog::open_in_memory().unwrap();
        promote_entry(&mut log, None, "retry loop needs a backoff cap", "deadbeef", &["retry".to_string()]).unwrap();

        let hits = search_shared(&log, "backoff", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("backoff"));
    }

    #[test]
    fn vector_search_excludes_the_requesting_project() {
        let mut log = EventLog::open_in_memory().unwrap();
        let mut vectors = VectorIndex::open(std::env::temp_dir().join("ctxmem-shared-test.json"), 3).unwrap();

        promote_entry(
            &mut log,
            Some((&mut vectors, vec![1.0, 0.0, 0.0])),
            "mine",
            "self-hash",
            &[],
        )
        .unwrap();
        promote_entry(
            &mut log,
            Some((&mut vectors, vec![1.0, 0.0, 0.0])),
            "theirs",
            "other-hash",
            &[],
        )
        .unwrap();

        let hits = vector_search_shared(&log, &vectors, &[1.0, 0.0, 0.0], "self-hash", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.content, "theirs");
    }
}
