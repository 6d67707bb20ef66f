//! Embedding worker (C4): drains the outbox for one `embedding_version`,
//! computes embeddings through an [`Embedder`], and upserts the vector
//! index. Never blocks ingest — it only ever runs against jobs already
//! sitting in the outbox.

use crate::error::{Error, Result};
use ctxmem_embed::Embedder;
use ctxmem_index::EventLog;
use ctxmem_types::{Event, EventType, ItemKind, OutboxJob};
use ctxmem_vector::{VectorIndex, VectorRecord};

/// Default batch size per drain, matching the design's "bound memory"
/// backpressure note.
pub const DEFAULT_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbeddingDrainReport {
    pub claimed: usize,
    pub embedded: usize,
    pub failed: usize,
}

/// Builds the text actually handed to the embedder. For everything but
/// `tool_observation` this is just the event's content; a tool
/// observation is enriched with the tool name, a file/command/pattern/
/// URL host if present in metadata, and a success flag, so semantically
/// similar tool calls embed close together even when their raw JSON
/// payloads differ.
pub fn derive_embedding_text(event: &Event) -> String {
    if event.event_type != EventType::ToolObservation {
        return event.content.clone();
    }

    let mut parts = vec![event.content.clone()];

    if let Some(tool) = event.metadata.get("tool_name").and_then(|v| v.as_str()) {
        parts.push(format!("tool:{tool}"));
    }
    for key in ["file", "command", "pattern"] {
        if let Some(value) = event.metadata.get(key).and_then(|v| v.as_str()) {
            parts.push(format!("{key}:{value}"));
        }
    }
    if let Some(url) = event.metadata.get("url").and_then(|v| v.as_str())
        && let Some(host) = url_host(url)
    {
        parts.push(format!("host:{host}"));
    }
    if let Some(success) = event.metadata.get("success").and_then(|v| v.as_bool()) {
        parts.push(format!("success:{success}"));
    }

    parts.join(" | ")
}

fn url_host(url: &str) -> Option<&str> {
    let after_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let host = after_scheme.split(['/', '?', '#']).next()?;
    (!host.is_empty()).then_some(host)
}

/// One drain pass: claim up to `batch_size` pending jobs for
/// `embedding_version`, embed and upsert each, then mark done/failed.
/// Any single job's failure (missing event, embedder error) fails only
/// that job — the rest of the batch still completes — per the outbox's
/// at-least-once contract.
pub fn drain_once(
    log: &EventLog,
    vector_index: &mut VectorIndex,
    embedder: &dyn Embedder,
    embedding_version: i64,
    batch_size: usize,
) -> Result<EmbeddingDrainReport> {
    let jobs = log.claim_outbox_jobs_for_version(embedding_version, batch_size)?;
    let mut report = EmbeddingDrainReport {
        claimed: jobs.len(),
        ..Default::default()
    };

    if jobs.is_empty() {
        return Ok(report);
    }

    for job in &jobs {
        match process_job(log, vector_index, embedder, job) {
            Ok(()) => {
                log.mark_outbox_done(job.job_id)?;
                report.embedded += 1;
            }
            Err(err) => {
                log.mark_outbox_failed(job.job_id, &err.to_string())?;
                report.failed += 1;
            }
        }
    }

    vector_index.save()?;
    Ok(report)
}

fn process_job(log: &EventLog, vector_index: &mut VectorIndex, embedder: &dyn Embedder, job: &OutboxJob) -> Result<()> {
    if job.item_kind != ItemKind::Event {
        return Err(Error::InputInvalid(format!(
            "embedding worker does not yet handle item_kind {:?}",
            job.item_kind
        )));
    }

    let event = log
        .get_by_id(&job.item_id)?
        .ok_or_else(|| Error::InputInvalid(format!("event {} missing for outbox job {}", job.item_id, job.job_id)))?;

    let text = derive_embedding_text(&event);
    let vector = embedder.embed(&text)?;

    vector_index.upsert(VectorRecord {
        id: Event::new_id(),
        event_id: event.id,
        session_id: event.session_id,
        event_type: event.event_type,
        content: event.content,
        vector,
        timestamp: event.timestamp,
        metadata: event.metadata,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxmem_embed::LocalEmbedder;
    use ctxmem_types::{EventInput, Metadata};
    use tempfile::TempDir;

    #[test]
    fn drains_pending_jobs_into_the_vector_index() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(EventInput::new(EventType::UserPrompt, "s1", "morning briefing preference"), &[1])
            .unwrap();

        let dir = TempDir::new().unwrap();
        let embedder = LocalEmbedder::new(32);
        let mut vectors = VectorIndex::open(dir.path().join("v.json"), embedder.dim()).unwrap();

        let report = drain_once(&log, &mut vectors, &embedder, 1, DEFAULT_BATCH_SIZE).unwrap();
        assert_eq!(report.claimed, 1);
        assert_eq!(report.embedded, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(vectors.count(), 1);
        assert_eq!(log.outbox_metrics().unwrap().done, 1);
    }

    #[test]
    fn tool_observation_text_includes_tool_name_and_success() {
        let mut metadata = Metadata::new();
        metadata.insert("tool_name", "bash");
        metadata.insert("command", "cargo test");
        metadata.insert("success", true);

        let event = Event {
            id: "e1".to_string(),
            event_type: EventType::ToolObservation,
            session_id: "s1".to_string(),
            turn_id: None,
            timestamp: chrono::Utc::now(),
            content: "ran tests".to_string(),
            canonical_key: "k".to_string(),
            dedupe_key: "s1:x".to_string(),
            metadata,
            rowid: 1,
        };

        let text = derive_embedding_text(&event);
        assert!(text.contains("tool:bash"));
        assert!(text.contains("command:cargo test"));
        assert!(text.contains("success:true"));
    }

    #[test]
    fn missing_event_fails_only_that_job() {
        let log = EventLog::open_in_memory().unwrap();
        log.enqueue(ItemKind::Event, "does-not-exist", 1).unwrap();

        let dir = TempDir::new().unwrap();
        let embedder = LocalEmbedder::new(16);
        let mut vectors = VectorIndex::open(dir.path().join("v.json"), embedder.dim()).unwrap();

        let report = drain_once(&log, &mut vectors, &embedder, 1, DEFAULT_BATCH_SIZE).unwrap();
        assert_eq!(report.claimed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(vectors.count(), 0);
    }
}
