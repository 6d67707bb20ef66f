use crate::context::ExecutionContext;
use crate::output::{self, heading};
use anyhow::Result;

pub fn run(ctx: &ExecutionContext, json: bool) -> Result<()> {
    let client = ctx.client()?;
    let stats = client.stats()?;

    output::render(json, &stats_json(&stats), || {
        println!("{}", heading(&format!("project {}", stats.project_hash)));
        println!("sessions:        {}", stats.session_count);
        println!("vectors:         {}", stats.vector_count);
        println!("outbox pending:  {}", stats.outbox.pending);
        println!("outbox processing: {}", stats.outbox.processing);
        println!("outbox done:     {}", stats.outbox.done);
        println!("outbox failed:   {}", stats.outbox.failed);
        if let Some(age) = stats.outbox.oldest_pending_age_secs {
            println!("oldest pending:  {age}s");
        }
    })
}

/// `Stats` itself doesn't derive `Serialize` (it wraps `OutboxMetrics`,
/// which lives in `ctxmem-index` and has no serde dependency) — project
/// this view's fields into plain JSON instead of adding a serde bound to
/// a type that otherwise has no business depending on it.
fn stats_json(stats: &ctxmem_sdk::Stats) -> serde_json::Value {
    serde_json::json!({
        "project_hash": stats.project_hash,
        "session_count": stats.session_count,
        "vector_count": stats.vector_count,
        "outbox": {
            "pending": stats.outbox.pending,
            "processing": stats.outbox.processing,
            "done": stats.outbox.done,
            "failed": stats.outbox.failed,
            "oldest_pending_age_secs": stats.outbox.oldest_pending_age_secs,
        },
    })
}
