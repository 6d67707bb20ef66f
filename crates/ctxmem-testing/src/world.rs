//! `TestWorld`: an isolated memory home plus an opened `Client`.

use anyhow::Result;
use ctxmem_embed::{Embedder, LocalEmbedder};
use ctxmem_sdk::{Client, Layout};
use std::sync::Arc;
use tempfile::TempDir;

/// A temp-directory-backed memory home with a project already opened
/// against it. Dropping the world removes the directory.
pub struct TestWorld {
    _home: TempDir,
    _project_dir: TempDir,
    project_root: String,
    client: Client,
}

impl TestWorld {
    /// Opens a fresh memory home under a temp directory and a client for
    /// `project_root` (itself a distinct temp directory, so `project_hash`
    /// is stable within one `TestWorld` but never collides across tests).
    pub fn new() -> Result<Self> {
        let home = TempDir::new()?;
        let project_dir = TempDir::new()?;
        let project_root = project_dir.path().to_string_lossy().into_owned();

        let layout = Layout::resolve(Some(&home.path().to_string_lossy()))?;
        let embedder: Arc<dyn Embedder> = Arc::new(LocalEmbedder::default());
        let client = Client::open(layout, &project_root, embedder)?;

        Ok(Self { _home: home, _project_dir: project_dir, project_root, client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn project_root(&self) -> &str {
        &self.project_root
    }

    pub fn memory_home(&self) -> &std::path::Path {
        self._home.path()
    }
}
