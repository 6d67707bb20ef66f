//! Resolves CLI-global flags into an opened `Client`, lazily and once
//! per invocation.

use anyhow::{Context, Result};
use ctxmem_embed::{Embedder, LocalEmbedder};
use ctxmem_sdk::{Client, Layout};
use std::sync::Arc;

pub struct ExecutionContext {
    project_root: String,
    memory_home: Option<String>,
}

impl ExecutionContext {
    pub fn new(project_root: Option<String>, memory_home: Option<String>) -> Result<Self> {
        let project_root = match project_root {
            Some(root) => root,
            None => std::env::current_dir()
                .context("could not resolve the current working directory as a project root")?
                .to_string_lossy()
                .into_owned(),
        };
        Ok(Self { project_root, memory_home })
    }

    /// Opens this invocation's project engine using the dependency-free
    /// local embedder — the zero-configuration path every CLI command
    /// takes unless a remote embedder is configured (not wired into the
    /// CLI surface; see `ctxmem-runtime::config`).
    pub fn client(&self) -> Result<Client> {
        let layout = Layout::resolve(self.memory_home.as_deref()).context("could not resolve the memory home directory")?;
        let embedder: Arc<dyn Embedder> = Arc::new(LocalEmbedder::default());
        Client::open(layout, &self.project_root, embedder).context("could not open the project's memory store")
    }
}
