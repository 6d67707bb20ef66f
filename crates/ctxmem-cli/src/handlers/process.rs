//! The `ctxmem process` subcommand: the CLI-side entry point for the
//! ingest protocol (§6). One JSON object read from stdin, one JSON
//! object written to stdout, regardless of whether anything inside
//! failed — the host assistant must never break because the memory
//! layer did.

use ctxmem_embed::{Embedder, LocalEmbedder};
use std::sync::Arc;

pub fn run() -> anyhow::Result<()> {
    let embedder: Arc<dyn Embedder> = Arc::new(LocalEmbedder::default());
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    ctxmem_sdk::run_hook(stdin.lock(), stdout.lock(), embedder)?;
    Ok(())
}
