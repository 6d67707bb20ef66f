use crate::args::{Cli, Commands};
use crate::context::ExecutionContext;
use crate::handlers;
use anyhow::Result;

pub fn run(cli: Cli) -> Result<()> {
    // `process` speaks the raw stdin/stdout hook protocol and must never
    // resolve a project root itself — the request body carries `cwd`.
    if let Commands::Process = cli.command {
        return handlers::process::run();
    }

    let ctx = ExecutionContext::new(cli.project_root, cli.memory_home)?;

    match cli.command {
        Commands::Process => unreachable!("handled above"),
        Commands::Search { query, strategy, session, top_k, min_score } => {
            handlers::search::run(&ctx, &query, &strategy, session, top_k, min_score, cli.json)
        }
        Commands::History { session_id, turn } => handlers::history::run(&ctx, &session_id, turn, cli.json),
        Commands::Stats => handlers::stats::run(&ctx, cli.json),
        Commands::Import { path } => handlers::import::run(&ctx, &path),
        Commands::List { limit } => handlers::list::run(&ctx, limit, cli.json),
        Commands::Forget { session_id, yes } => handlers::forget::run(&ctx, &session_id, yes),
    }
}
