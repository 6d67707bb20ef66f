use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ctxmem")]
#[command(about = "Local-first conversational memory engine for coding agents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Project root to scope this invocation to. Defaults to the current
    /// working directory, matching the hook protocol's `cwd` field.
    #[arg(long, global = true)]
    pub project_root: Option<String>,

    /// Memory home directory override. Defaults to `CLAUDE_MEMORY_HOME` or
    /// the platform data directory.
    #[arg(long, global = true)]
    pub memory_home: Option<String>,

    /// Emit machine-readable JSON instead of the human-formatted view.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the hybrid retrieval pipeline for a query.
    Search {
        query: String,

        #[arg(long, value_parser = ["auto", "fast", "deep"], default_value = "auto")]
        strategy: String,

        #[arg(long)]
        session: Option<String>,

        #[arg(long, default_value = "10")]
        top_k: usize,

        #[arg(long)]
        min_score: Option<f64>,
    },

    /// Show one session's events in insertion order.
    History {
        session_id: String,

        #[arg(long)]
        turn: Option<String>,
    },

    /// Summarize this project's storage: session count, vector index
    /// size, and outbox queue depth.
    Stats,

    /// Read one JSON hook request from stdin, write one JSON hook
    /// response to stdout. Never fails the host: a malformed request or
    /// an internal error still yields a valid empty-context response.
    Process,

    /// Replay a JSONL file of previously exported events through the
    /// idempotent import path.
    Import {
        path: std::path::PathBuf,
    },

    /// List recent sessions for this project.
    List {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Permanently delete one session's events and derived state, for
    /// reimport only.
    Forget {
        session_id: String,

        #[arg(long)]
        yes: bool,
    },
}
