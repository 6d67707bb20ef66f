use crate::error::Result;
use ctxmem_embed::{Embedder, LocalEmbedder};
use ctxmem_engine::{RetrieveOptions, RetrieveResult};
use ctxmem_index::{AppendOutcome, ImportOutcome, OutboxMetrics};
use ctxmem_runtime::{registry, Layout, ProjectEngine};
use ctxmem_types::{Event, EventInput, Session};
use std::sync::{Arc, Mutex, MutexGuard};

/// Snapshot of one project's storage, surfaced by `ctxmem stats`.
#[derive(Debug, Clone)]
pub struct Stats {
    pub project_hash: String,
    pub session_count: usize,
    pub vector_count: usize,
    pub outbox: OutboxMetrics,
}

/// Public facade over one project's memory engine. Collaborators (the
/// hook protocol in this crate, `ctxmem-cli`, or an embedding host)
/// depend on `Client`, never directly on `ctxmem-index`/`ctxmem-vector`.
///
/// Cheap to clone: internally an `Arc<Mutex<ProjectEngine>>`, so a host
/// process can hand a `Client` to multiple request handlers.
#[derive(Clone)]
pub struct Client {
    engine: Arc<Mutex<ProjectEngine>>,
}

impl Client {
    /// Opens the engine for `project_root` under `layout`'s memory home,
    /// using `embedder` for both ingest-time (background) and query-time
    /// embeddings.
    pub fn open(layout: Layout, project_root: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let engine = ProjectEngine::open(layout, project_root, embedder)?;
        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
        })
    }

    /// Opens `project_root` using the default memory home
    /// (`CLAUDE_MEMORY_HOME` or the platform data directory) and the
    /// dependency-free local embedder — the zero-configuration path a
    /// hook script or a first-run CLI invocation takes.
    pub fn connect_default(project_root: &str) -> Result<Self> {
        let layout = Layout::resolve(None)?;
        let embedder: Arc<dyn Embedder> = Arc::new(LocalEmbedder::default());
        Self::open(layout, project_root, embedder)
    }

    /// Appends one event, enqueuing it for background embedding.
    pub fn ingest(&self, input: EventInput) -> Result<AppendOutcome> {
        let mut engine = self.lock();
        Ok(engine.ingest(input)?)
    }

    /// Runs the hybrid retrieval pipeline for `query`.
    pub fn retrieve(&self, query: &str, opts: RetrieveOptions) -> Result<RetrieveResult> {
        let engine = self.lock();
        Ok(engine.retrieve(query, opts)?)
    }

    /// Starts this project's background workers (embedding drain,
    /// consolidation, helpfulness sweep, turn-state cleanup). Idempotent:
    /// a second call for the same project reuses the already-running
    /// workers rather than spawning duplicates.
    pub fn start_background_workers(&self) -> Result<()> {
        let engine = self.lock();
        Ok(engine.start_workers()?)
    }

    /// Records this session's project association in the well-known
    /// session registry, so a later lookup by `session_id` alone (e.g.
    /// from a differently-rooted hook invocation) can recover the
    /// project path.
    pub fn register_session(&self, session_id: &str, project_path: &str) -> Result<()> {
        let engine = self.lock();
        let hash = engine.hash().as_str().to_string();
        registry::register_session(engine.layout(), session_id, project_path, &hash)?;
        Ok(())
    }

    /// Writes (or refreshes) the session's current turn marker, used by
    /// the hook protocol to group a sequence of hook invocations under
    /// one `turn_id`.
    pub fn write_turn_marker(&self, session_id: &str, turn_id: &str) -> Result<()> {
        let engine = self.lock();
        ctxmem_runtime::turn_state::write(engine.layout(), session_id, turn_id)?;
        Ok(())
    }

    /// Reads the session's current (non-stale) turn marker, if any.
    pub fn read_turn_marker(&self, session_id: &str) -> Option<String> {
        let engine = self.lock();
        ctxmem_runtime::turn_state::read(engine.layout(), session_id).map(|state| state.turn_id)
    }

    /// All events of one session, in insertion order. Backs `ctxmem
    /// history`.
    pub fn history(&self, session_id: &str) -> Result<Vec<Event>> {
        let engine = self.lock();
        Ok(engine.log().get_session_events(session_id)?)
    }

    /// The most recently started sessions for this project, newest first.
    /// Backs `ctxmem list`.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<Session>> {
        let engine = self.lock();
        Ok(engine.log().list_sessions(limit)?)
    }

    /// A point-in-time snapshot of this project's storage: session count,
    /// vector index size, and outbox queue depth. Backs `ctxmem stats`.
    pub fn stats(&self) -> Result<Stats> {
        let engine = self.lock();
        Ok(Stats {
            project_hash: engine.hash().as_str().to_string(),
            session_count: engine.log().list_sessions(usize::MAX)?.len(),
            vector_count: engine.vectors().count(),
            outbox: engine.log().outbox_metrics()?,
        })
    }

    /// Replays a batch of previously exported events through the
    /// idempotent import path (dedupe/id collisions are skipped, not
    /// errors). Backs `ctxmem import`.
    pub fn import(&self, batch: Vec<EventInput>) -> Result<ImportOutcome> {
        let mut engine = self.lock();
        let version = ctxmem_runtime::CURRENT_EMBEDDING_VERSION;
        Ok(engine.log_mut().import_events(batch, &[version])?)
    }

    /// Permanently removes every event of one session and its derived
    /// state (outbox jobs, helpfulness records, working-set entries), for
    /// reimport only. Backs `ctxmem forget`.
    pub fn forget_session(&self, session_id: &str) -> Result<usize> {
        let engine = self.lock();
        Ok(engine.log().delete_session_events(session_id)?)
    }

    fn lock(&self) -> MutexGuard<'_, ProjectEngine> {
        self.engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxmem_embed::LocalEmbedder;
    use ctxmem_types::EventType;
    use tempfile::TempDir;

    fn client_at(dir: &TempDir) -> Client {
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap())).unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(LocalEmbedder::new(32));
        Client::open(layout, "/tmp/some-project", embedder).unwrap()
    }

    #[test]
    fn history_returns_a_sessions_events_in_insertion_order() {
        let dir = TempDir::new().unwrap();
        let client = client_at(&dir);
        client.ingest(EventInput::new(EventType::UserPrompt, "s1", "one")).unwrap();
        client.ingest(EventInput::new(EventType::UserPrompt, "s1", "two")).unwrap();

        let history = client.history("s1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "one");
        assert_eq!(history[1].content, "two");
    }

    #[test]
    fn stats_reports_outbox_and_session_counts() {
        let dir = TempDir::new().unwrap();
        let client = client_at(&dir);
        client.ingest(EventInput::new(EventType::UserPrompt, "s1", "hello")).unwrap();

        let stats = client.stats().unwrap();
        assert_eq!(stats.outbox.pending, 1);
        assert_eq!(stats.project_hash.len(), 8);
    }

    #[test]
    fn forget_session_clears_events_and_allows_reimport() {
        let dir = TempDir::new().unwrap();
        let client = client_at(&dir);
        client.ingest(EventInput::new(EventType::UserPrompt, "s1", "hello")).unwrap();

        let removed = client.forget_session("s1").unwrap();
        assert_eq!(removed, 1);
        assert!(client.history("s1").unwrap().is_empty());
    }

    #[test]
    fn import_skips_a_replayed_batch_on_the_second_call() {
        let dir = TempDir::new().unwrap();
        let client = client_at(&dir);
        let mut input = EventInput::new(EventType::UserPrompt, "s1", "hello");
        input.id = Some("fixed-id".to_string());
        input.canonical_key = Some("hello".to_string());
        input.dedupe_key = Some("s1:deadbeef".to_string());

        let first = client.import(vec![input.clone()]).unwrap();
        let second = client.import(vec![input]).unwrap();
        assert_eq!(first.inserted, 1);
        assert_eq!(second.inserted, 0);
    }
}
