use crate::context::ExecutionContext;
use crate::output::heading;
use anyhow::{Context, Result};
use ctxmem_sdk::{Event, EventInput};
use std::path::Path;

/// Reads one JSON-encoded `Event` per line and replays it through the
/// idempotent import path, preserving each event's `id`/`canonical_key`/
/// `dedupe_key` exactly as recorded — the same contract the replicator's
/// pull loop relies on (§4.9).
pub fn run(ctx: &ExecutionContext, path: &Path) -> Result<()> {
    let client = ctx.client()?;
    let content = std::fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;

    let mut batch = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: Event = serde_json::from_str(line).with_context(|| format!("{}:{}: not a valid event record", path.display(), line_no + 1))?;
        batch.push(to_input(event));
    }

    let outcome = client.import(batch)?;
    println!("{}", heading(&format!("imported {} event(s), skipped {}", outcome.inserted, outcome.skipped)));
    Ok(())
}

fn to_input(event: Event) -> EventInput {
    let mut input = EventInput::new(event.event_type, event.session_id, event.content).with_timestamp(event.timestamp).with_metadata(event.metadata);
    if let Some(turn_id) = event.turn_id {
        input = input.with_turn_id(turn_id);
    }
    input.id = Some(event.id);
    input.canonical_key = Some(event.canonical_key);
    input.dedupe_key = Some(event.dedupe_key);
    input
}
