use crate::context::ExecutionContext;
use crate::output::{self, heading};
use anyhow::Result;

pub fn run(ctx: &ExecutionContext, session_id: &str, turn: Option<String>, json: bool) -> Result<()> {
    let client = ctx.client()?;
    let mut events = client.history(session_id)?;
    if let Some(turn) = turn {
        events.retain(|e| e.turn_id.as_deref() == Some(turn.as_str()));
    }

    output::render(json, &events, || {
        println!("{}", heading(&format!("{} event(s) in session {session_id}", events.len())));
        for event in &events {
            let turn = event.turn_id.as_deref().unwrap_or("-");
            println!("[{}] ({}, turn={}) {}", event.timestamp.format("%Y-%m-%d %H:%M:%S"), event.event_type.as_str(), turn, event.content);
        }
    })
}
