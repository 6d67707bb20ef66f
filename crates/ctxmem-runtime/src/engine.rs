//! `ProjectEngine`: the facade that ties one project's storage
//! (`EventLog`, `VectorIndex`), configuration, and background workers
//! together. This is the thing `ctxmem-sdk` and `ctxmem-cli` actually
//! hold — neither talks to `ctxmem-index`/`ctxmem-vector` directly.

use crate::config::Config;
use crate::consolidation::ConsolidationScheduler;
use crate::error::Result;
use crate::paths::Layout;
use crate::registry;
use crate::worker::Worker;
use crate::{embedding, helpfulness, turn_state};
use ctxmem_core::path::ProjectHash;
use ctxmem_embed::Embedder;
use ctxmem_engine::{retrieve, ConsolidationTriggers, RetrieveOptions, RetrieveResult};
use ctxmem_index::{AppendOutcome, EventLog};
use ctxmem_types::EventInput;
use ctxmem_vector::VectorIndex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Embedding schema version this build writes. A deployment that changes
/// its embedder in a way that invalidates old vectors bumps this and
/// leaves the embedding worker draining both versions until old vectors
/// have all been superseded.
pub const CURRENT_EMBEDDING_VERSION: i64 = 1;

const EMBEDDING_TICK: Duration = Duration::from_secs(5);
const CONSOLIDATION_TICK: Duration = Duration::from_secs(60);
const HELPFULNESS_TICK: Duration = Duration::from_secs(300);
const TURN_STATE_CLEANUP_TICK: Duration = Duration::from_secs(900);

/// One project's open storage handles plus the configuration and
/// embedder used to drive it. Holds the "foreground" `EventLog`/
/// `VectorIndex` connections used by `ingest`/`retrieve`; background
/// workers spawned via [`ProjectEngine::start_workers`] open their own
/// independent connections to the same files.
pub struct ProjectEngine {
    layout: Layout,
    hash: ProjectHash,
    events_path: PathBuf,
    vectors_path: PathBuf,
    config: Config,
    embedder: Arc<dyn Embedder>,
    log: EventLog,
    vectors: VectorIndex,
}

impl ProjectEngine {
    /// Opens (creating on first use) the event log and vector index for
    /// `project_root` under `layout`'s memory home, loading this
    /// project's config from the home directory.
    pub fn open(layout: Layout, project_root: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let hash = layout.project_hash(project_root);
        let events_path = layout.events_db_path(&hash);
        let vectors_path = layout.vectors_dir(&hash).join("vectors.json");
        let config = Config::load(layout.home())?;

        let log = EventLog::open(&events_path)?;
        let vectors = VectorIndex::open(&vectors_path, embedder.dim())?;

        Ok(Self {
            layout,
            hash,
            events_path,
            vectors_path,
            config,
            embedder,
            log,
            vectors,
        })
    }

    pub fn hash(&self) -> &ProjectHash {
        &self.hash
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }

    pub fn vectors(&self) -> &VectorIndex {
        &self.vectors
    }

    /// Appends one event and enqueues it for embedding under the current
    /// embedding version. Never blocks on embedding — that's the
    /// background drain's job.
    pub fn ingest(&mut self, input: EventInput) -> Result<AppendOutcome> {
        Ok(self.log.append(input, &[CURRENT_EMBEDDING_VERSION])?)
    }

    /// Retrieves memories for `query`, computing a query embedding through
    /// this project's embedder unless the caller already supplied one.
    pub fn retrieve(&self, query: &str, mut opts: RetrieveOptions) -> Result<RetrieveResult> {
        if opts.query_vector.is_none() {
            opts.query_vector = Some(self.embedder.embed(query)?);
        }
        Ok(retrieve(&self.log, &self.vectors, query, &opts)?)
    }

    /// Spawns this project's background workers (embedding drain,
    /// consolidation, helpfulness sweep, turn-state cleanup) and registers
    /// them under the process-wide worker table, keyed by this project's
    /// hash, so a repeat call reuses rather than duplicates them. Each
    /// worker opens its own connection to the shared sqlite file and
    /// vector index file, consistent with the one-writer-per-connection
    /// model `EventLog` documents.
    pub fn start_workers(&self) -> Result<()> {
        self.start_embedding_worker()?;
        self.start_consolidation_worker()?;
        self.start_helpfulness_worker()?;
        self.start_turn_state_cleanup_worker()?;
        Ok(())
    }

    fn start_embedding_worker(&self) -> Result<()> {
        let events_path = self.events_path.clone();
        let embedder = self.embedder.clone();
        let batch_size = self.config.embedding_batch_size;

        let log = EventLog::open(&events_path)?;
        let mut vectors = VectorIndex::open(&self.vectors_path, embedder.dim())?;

        let worker = Worker::spawn(format!("{}-embedding", self.hash.as_str()), EMBEDDING_TICK, move || {
            if let Err(err) = embedding::drain_once(&log, &mut vectors, embedder.as_ref(), CURRENT_EMBEDDING_VERSION, batch_size) {
                eprintln!("ctxmem: embedding drain failed: {err}");
            }
        })?;
        registry::register_worker(format!("{}:embedding", self.hash.as_str()), worker);
        Ok(())
    }

    fn start_consolidation_worker(&self) -> Result<()> {
        let events_path = self.events_path.clone();
        let interval_mins = self.config.consolidation_interval_mins;
        let log = EventLog::open(&events_path)?;
        let mut scheduler = ConsolidationScheduler::new(ConsolidationTriggers {
            interval: chrono::Duration::minutes(interval_mins),
            ..ConsolidationTriggers::default()
        });

        let worker = Worker::spawn(format!("{}-consolidation", self.hash.as_str()), CONSOLIDATION_TICK, move || {
            if let Err(err) = scheduler.tick(&log) {
                eprintln!("ctxmem: consolidation tick failed: {err}");
            }
        })?;
        registry::register_worker(format!("{}:consolidation", self.hash.as_str()), worker);
        Ok(())
    }

    fn start_helpfulness_worker(&self) -> Result<()> {
        let events_path = self.events_path.clone();
        let log = EventLog::open(&events_path)?;

        let worker = Worker::spawn(format!("{}-helpfulness", self.hash.as_str()), HELPFULNESS_TICK, move || {
            if let Err(err) = helpfulness::sweep(&log) {
                eprintln!("ctxmem: helpfulness sweep failed: {err}");
            }
        })?;
        registry::register_worker(format!("{}:helpfulness", self.hash.as_str()), worker);
        Ok(())
    }

    fn start_turn_state_cleanup_worker(&self) -> Result<()> {
        let home = self.layout.home().to_path_buf();
        let worker = Worker::spawn(format!("{}-turn-state-cleanup", self.hash.as_str()), TURN_STATE_CLEANUP_TICK, move || {
            let Ok(layout) = Layout::resolve(home.to_str()) else {
                eprintln!("ctxmem: turn-state cleanup could not resolve layout for {}", home.display());
                return;
            };
            let removed = turn_state::cleanup_stale(&layout);
            if removed > 0 {
                eprintln!("ctxmem: turn-state cleanup removed {removed} stale file(s)");
            }
        })?;
        registry::register_worker(format!("{}:turn-state-cleanup", self.hash.as_str()), worker);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxmem_embed::LocalEmbedder;
    use ctxmem_types::EventType;
    use tempfile::TempDir;

    fn engine_at(dir: &TempDir) -> ProjectEngine {
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap())).unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(LocalEmbedder::new(32));
        ProjectEngine::open(layout, "/tmp/some-project", embedder).unwrap()
    }

    #[test]
    fn ingest_then_retrieve_finds_the_event_once_embedded() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(&dir);

        engine
            .ingest(EventInput::new(EventType::UserPrompt, "s1", "prefers dark mode in the editor"))
            .unwrap();

        // No embedding worker running in this test, so the outbox job for
        // this event is still pending; a keyword-based retrieve still
        // finds it via the Auto strategy's primary (FTS) stage.
        let result = engine
            .retrieve("dark mode", RetrieveOptions::default())
            .unwrap();
        assert!(!result.memories.is_empty());
    }

    #[test]
    fn opening_the_same_project_root_twice_resolves_to_the_same_hash() {
        let dir = TempDir::new().unwrap();
        let layout_a = Layout::resolve(Some(dir.path().to_str().unwrap())).unwrap();
        let layout_b = Layout::resolve(Some(dir.path().to_str().unwrap())).unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(LocalEmbedder::new(32));

        let a = ProjectEngine::open(layout_a, "/tmp/same-project", embedder.clone()).unwrap();
        let b = ProjectEngine::open(layout_b, "/tmp/same-project", embedder).unwrap();
        assert_eq!(a.hash(), b.hash());
    }
}
