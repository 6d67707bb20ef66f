use crate::context::ExecutionContext;
use crate::output::{self, heading};
use anyhow::Result;

pub fn run(ctx: &ExecutionContext, limit: usize, json: bool) -> Result<()> {
    let client = ctx.client()?;
    let sessions = client.list_sessions(limit)?;

    output::render(json, &sessions, || {
        println!("{}", heading(&format!("{} session(s)", sessions.len())));
        for session in &sessions {
            let status = if session.is_ended() { "ended" } else { "active" };
            println!("{}  {}  started {}", session.id, status, session.started_at.format("%Y-%m-%d %H:%M:%S"));
        }
    })
}
